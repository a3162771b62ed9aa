//! Profile registry: the semantic catalog mapping message numbers to typed
//! field descriptors.
//!
//! A [`Profile`] is built once at startup, validated, and then shared
//! read-only across decoders (wrap it in an `Arc`). The full Garmin global
//! profile is supplied by an external generator; this module only defines
//! the registry structure and its contract checks.

mod field;

pub use field::{
    ComponentField, Field, FieldDescriptor, FieldType, ReferenceField, SubField, TypeRef,
};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::{FitError, Result};
use crate::types::BaseType;

/// The field layout of one global message number.
#[derive(Debug, Clone)]
pub struct MessageType {
    pub name: String,
    pub mesg_num: u16,
    fields: HashMap<u8, Arc<Field>>,
}

impl MessageType {
    pub fn new(name: impl Into<String>, mesg_num: u16) -> Self {
        Self { name: name.into(), mesg_num, fields: HashMap::new() }
    }

    /// Add a field, keyed by its definition number.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.insert(field.def_num, Arc::new(field));
        self
    }

    /// Look up a field by definition number.
    pub fn get_field(&self, def_num: u8) -> Option<&Arc<Field>> {
        self.fields.get(&def_num)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Registry of message types, keyed by global message number.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    messages: HashMap<u16, MessageType>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validated profile from a set of message types.
    pub fn from_messages(messages: impl IntoIterator<Item = MessageType>) -> Result<Self> {
        let mut profile = Profile::new();
        for message in messages {
            profile.add_message(message);
        }
        profile.validate()?;
        Ok(profile)
    }

    /// Register a message type. Re-registering a message number replaces the
    /// earlier entry.
    pub fn add_message(&mut self, message: MessageType) {
        self.messages.insert(message.mesg_num, message);
    }

    /// Look up a message type by global message number.
    pub fn message(&self, mesg_num: u16) -> Option<&MessageType> {
        self.messages.get(&mesg_num)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Check definition-time contracts, before any message is decoded.
    ///
    /// Component bit ranges exceeding their container's width are fatal
    /// misconfigurations here, never per-message errors. `string` and `byte`
    /// containers have no fixed width, so only the 64-bit extraction limit
    /// applies to them.
    pub fn validate(&self) -> Result<()> {
        for message in self.messages.values() {
            for field in message.fields.values() {
                self.validate_components(message, &field.name, field.base_type(), &field.components)?;
                for subfield in &field.subfields {
                    self.validate_components(
                        message,
                        &subfield.name,
                        subfield.type_ref.base_type(),
                        &subfield.components,
                    )?;
                    for reference in &subfield.ref_fields {
                        if message.get_field(reference.def_num).is_none() {
                            warn!(
                                message = %message.name,
                                subfield = %subfield.name,
                                reference = %reference.name,
                                "Subfield references a field absent from its message type"
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_components(
        &self,
        message: &MessageType,
        owner: &str,
        container: BaseType,
        components: &[ComponentField],
    ) -> Result<()> {
        for component in components {
            if component.bits == 0 || component.bits > 64 {
                return Err(FitError::profile(
                    format!("message {}", message.name),
                    format!("component {} declares {} bits", component.name, component.bits),
                ));
            }

            if message.get_field(component.def_num).is_none() {
                return Err(FitError::profile(
                    format!("message {}", message.name),
                    format!(
                        "component {} of {owner} targets unknown field {}",
                        component.name, component.def_num
                    ),
                ));
            }

            // Fixed-width containers can be range-checked now. Byte blobs
            // and strings vary per definition record.
            let fixed_width = !matches!(container, BaseType::Byte | BaseType::String);
            let width = 8 * container.size() as u32;
            if fixed_width && u32::from(component.bit_offset) + u32::from(component.bits) > width {
                return Err(FitError::profile(
                    format!("message {}", message.name),
                    format!(
                        "component {} bit range [{}, {}) exceeds the {width}-bit container of {owner}",
                        component.name,
                        component.bit_offset,
                        u32::from(component.bit_offset) + u32::from(component.bits),
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_message() -> MessageType {
        MessageType::new("record", 20)
            .field(Field::new("speed", 6, BaseType::UInt16).scale(1000.0).units("m/s"))
            .field(
                Field::new("compressed_speed_distance", 8, BaseType::Byte)
                    .component(ComponentField::new("speed", 6, 12, 0).scale(100.0)),
            )
    }

    #[test]
    fn valid_profile_passes_validation() {
        let profile = Profile::from_messages([record_message()]).unwrap();
        assert_eq!(profile.message_count(), 1);
        assert_eq!(profile.message(20).unwrap().field_count(), 2);
        assert!(profile.message(99).is_none());
    }

    #[test]
    fn component_exceeding_container_width_fails_validation() {
        let message = MessageType::new("record", 20)
            .field(Field::new("cycles", 4, BaseType::UInt8))
            .field(
                Field::new("packed", 5, BaseType::UInt16)
                    .component(ComponentField::new("cycles", 4, 12, 8)),
            );

        let result = Profile::from_messages([message]);
        assert!(matches!(result, Err(FitError::Profile { .. })));
    }

    #[test]
    fn component_targeting_unknown_field_fails_validation() {
        let message = MessageType::new("record", 20).field(
            Field::new("packed", 5, BaseType::UInt32)
                .component(ComponentField::new("missing", 42, 8, 0)),
        );

        let result = Profile::from_messages([message]);
        assert!(matches!(result, Err(FitError::Profile { .. })));
    }

    #[test]
    fn byte_containers_skip_fixed_width_check() {
        // A 12-bit slice from a byte blob is fine; the blob's width is only
        // known once a definition record declares its size.
        let profile = Profile::from_messages([record_message()]);
        assert!(profile.is_ok());
    }

    #[test]
    fn zero_bit_component_is_rejected() {
        let message = MessageType::new("record", 20)
            .field(Field::new("cycles", 4, BaseType::UInt8))
            .field(
                Field::new("packed", 5, BaseType::UInt32)
                    .component(ComponentField::new("cycles", 4, 0, 0)),
            );

        assert!(Profile::from_messages([message]).is_err());
    }
}
