//! Message assembly: turning raw records into [`DataMessage`]s.
//!
//! A [`MessageDecoder`] holds the per-stream state the engine needs between
//! records: the active definition for each local message slot, and the
//! running totals backing `accumulate` components. Scope one decoder to one
//! stream/session; the profile behind it is read-only and can be shared by
//! any number of decoders, concurrent or not.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{FitError, Result};
use crate::message::{DataMessage, DefinitionMessage, FieldData, FieldSpec};
use crate::profile::{ComponentField, FieldDescriptor, Profile, TypeRef};
use crate::render::render;
use crate::types::Value;

/// Decodes data records against an immutable profile.
pub struct MessageDecoder {
    profile: Arc<Profile>,
    definitions: HashMap<u8, Arc<DefinitionMessage>>,
    /// Running totals for accumulating components, keyed by
    /// `(global message number, component definition number)`.
    accumulators: HashMap<(u16, u8), u64>,
}

impl MessageDecoder {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self { profile, definitions: HashMap::new(), accumulators: HashMap::new() }
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    /// Register a definition record for its local slot, replacing any
    /// earlier definition of that slot.
    pub fn add_definition(&mut self, definition: DefinitionMessage) -> Arc<DefinitionMessage> {
        debug!(
            local_mesg_num = definition.local_mesg_num,
            mesg_num = definition.mesg_num,
            fields = definition.field_defs.len(),
            "Registering definition message"
        );
        let definition = Arc::new(definition);
        self.definitions.insert(definition.local_mesg_num, Arc::clone(&definition));
        definition
    }

    /// The active definition for a local slot, if one has been registered.
    pub fn definition(&self, local_mesg_num: u8) -> Option<&Arc<DefinitionMessage>> {
        self.definitions.get(&local_mesg_num)
    }

    /// Decode a data record for a local slot against its active definition.
    ///
    /// `raw_fields` holds `(definition number, raw payload)` per field, in
    /// the definition's declared order.
    pub fn decode_data(
        &mut self,
        local_mesg_num: u8,
        raw_fields: &[(u8, &[u8])],
    ) -> Result<DataMessage> {
        let definition = self
            .definitions
            .get(&local_mesg_num)
            .cloned()
            .ok_or(FitError::UnknownLocalMessage { local_mesg_num })?;
        self.decode_message(&definition, raw_fields)
    }

    /// Decode a data record against an explicit definition.
    pub fn decode_message(
        &mut self,
        definition: &Arc<DefinitionMessage>,
        raw_fields: &[(u8, &[u8])],
    ) -> Result<DataMessage> {
        if raw_fields.len() != definition.field_defs.len() {
            return Err(FitError::decode(
                format!("message {}", definition.mesg_num),
                format!(
                    "record carries {} fields, definition declares {}",
                    raw_fields.len(),
                    definition.field_defs.len()
                ),
            ));
        }

        let profile = Arc::clone(&self.profile);
        let message_type = profile.message(definition.mesg_num);
        if message_type.is_none() {
            trace!(mesg_num = definition.mesg_num, "No profile entry for message, decoding raw");
        }

        // First pass: base-type decode of every payload, in stream order,
        // so subfield reference checks can see the whole message.
        let mut raw_values: Vec<(u8, Option<Value>)> =
            Vec::with_capacity(definition.field_defs.len());
        for (field_def, (def_num, payload)) in definition.field_defs.iter().zip(raw_fields) {
            if field_def.def_num != *def_num {
                return Err(FitError::decode(
                    format!("message {}", definition.mesg_num),
                    format!(
                        "field {} arrived where the definition declares {}",
                        def_num, field_def.def_num
                    ),
                ));
            }
            if payload.len() != field_def.size as usize {
                return Err(FitError::FieldLength {
                    def_num: field_def.def_num,
                    expected: field_def.size as usize,
                    actual: payload.len(),
                });
            }
            let raw = field_def.base_type.decode(payload, definition.endian)?;
            raw_values.push((field_def.def_num, raw));
        }

        // Second pass: resolve descriptors, expand components, render.
        let mut fields: Vec<FieldData> = Vec::with_capacity(definition.field_defs.len());
        for (field_def, (_, raw_value)) in definition.field_defs.iter().zip(&raw_values) {
            let field = message_type.and_then(|message| message.get_field(field_def.def_num));

            // A wide field keeps any narrow accumulating counter with the
            // same definition number in sync.
            if let Some(raw) = raw_value.as_ref().and_then(Value::as_u64) {
                if let Some(total) =
                    self.accumulators.get_mut(&(definition.mesg_num, field_def.def_num))
                {
                    *total = raw;
                }
            }

            let (spec, parent) = match field {
                Some(field) => match field.resolve_subfield(&raw_values) {
                    Some(index) => (
                        Some(FieldSpec::SubField { parent: Arc::clone(field), index }),
                        Some(Arc::clone(field)),
                    ),
                    None => (Some(FieldSpec::Field(Arc::clone(field))), None),
                },
                None => {
                    trace!(
                        mesg_num = definition.mesg_num,
                        def_num = field_def.def_num,
                        "No profile entry for field, keeping numeric identity"
                    );
                    (None, None)
                }
            };

            if let Some(spec) = &spec {
                self.expand_components(
                    definition,
                    spec,
                    raw_value.as_ref(),
                    &raw_values,
                    &mut fields,
                );
            }

            let (value, units) = match &spec {
                Some(spec) => {
                    let descriptor = spec.descriptor();
                    (render(descriptor, raw_value.as_ref()), descriptor.units().map(str::to_owned))
                }
                None => (raw_value.clone(), None),
            };

            fields.push(FieldData::new(
                Some(*field_def),
                spec,
                parent,
                value,
                raw_value.clone(),
                units,
            ));
        }

        let name = message_type.map(|message| message.name.clone());
        Ok(DataMessage::new(Arc::clone(definition), name, fields))
    }

    /// Synthesize one FieldData per component declared by the resolved
    /// descriptor, bit-slicing the container value. The container itself is
    /// never mutated; every component sees the same bits.
    fn expand_components(
        &mut self,
        definition: &Arc<DefinitionMessage>,
        spec: &FieldSpec,
        raw_value: Option<&Value>,
        raw_values: &[(u8, Option<Value>)],
        fields: &mut Vec<FieldData>,
    ) {
        let declaring = match spec {
            FieldSpec::Field(field) => field,
            FieldSpec::SubField { parent, .. } => parent,
        };
        let descriptor = spec.descriptor();
        if descriptor.components().is_empty() {
            return;
        }

        let container = raw_value.and_then(normalize_container);

        // Components borrow the resolved descriptor; clone so accumulator
        // state can be updated while iterating.
        let components: Vec<ComponentField> = descriptor.components().to_vec();
        for component in &components {
            let mut extracted = container.map(|container| component.extract(container));
            if component.accumulate {
                if let Some(raw) = extracted {
                    extracted = Some(self.accumulate(definition.mesg_num, component, raw));
                }
            }
            let cmp_raw = extracted.map(Value::UInt64);

            // Component targets are checked at profile build; a miss here
            // means the profile was never validated.
            let Some(target) = self
                .profile
                .message(definition.mesg_num)
                .and_then(|message| message.get_field(component.def_num))
            else {
                trace!(
                    mesg_num = definition.mesg_num,
                    def_num = component.def_num,
                    "Component targets a field the profile does not know, skipping"
                );
                continue;
            };

            let target_spec = match target.resolve_subfield(raw_values) {
                Some(index) => FieldSpec::SubField { parent: Arc::clone(target), index },
                None => FieldSpec::Field(Arc::clone(target)),
            };

            let view = ComponentView { component, type_source: target_spec.descriptor() };
            let value = render(&view, cmp_raw.as_ref());
            let units = view.units().map(str::to_owned);

            fields.push(FieldData::new(
                None,
                Some(target_spec),
                Some(Arc::clone(declaring)),
                value,
                cmp_raw,
                units,
            ));
        }
    }

    /// Fold a new raw reading into a component's running total, detecting
    /// wraparound of the narrow bit field.
    fn accumulate(&mut self, mesg_num: u16, component: &ComponentField, raw: u64) -> u64 {
        let total = self.accumulators.entry((mesg_num, component.def_num)).or_insert(0);
        if component.bits >= 64 {
            *total = raw;
            return raw;
        }

        let max_value = 1u64 << component.bits;
        let mask = max_value - 1;
        let mut base = raw + (*total & !mask);
        if raw < (*total & mask) {
            base += max_value;
        }
        *total = base;
        base
    }
}

/// Rendering view for a component: the component's own scale, offset, and
/// units over the target field's type.
struct ComponentView<'a> {
    component: &'a ComponentField,
    type_source: &'a dyn FieldDescriptor,
}

impl FieldDescriptor for ComponentView<'_> {
    fn name(&self) -> &str {
        &self.component.name
    }
    fn def_num(&self) -> u8 {
        self.component.def_num
    }
    fn type_ref(&self) -> &TypeRef {
        self.type_source.type_ref()
    }
    fn scale(&self) -> Option<f64> {
        self.component.scale
    }
    fn offset(&self) -> Option<f64> {
        self.component.offset
    }
    fn units(&self) -> Option<&str> {
        self.component.units.as_deref().or_else(|| self.type_source.units())
    }
    fn components(&self) -> &[ComponentField] {
        &[]
    }
}

/// Normalize a container value to an unsigned integer: byte sequences
/// combine least-significant-byte-first; scalars are used directly.
fn normalize_container(raw: &Value) -> Option<u64> {
    match raw {
        Value::Bytes(bytes) => {
            let mut container = 0u64;
            for (i, byte) in bytes.iter().take(8).enumerate() {
                container |= u64::from(*byte) << (8 * i);
            }
            Some(container)
        }
        Value::Array(elements) => {
            let mut container = 0u64;
            for (i, element) in elements.iter().take(8).enumerate() {
                let byte = element.as_ref().and_then(Value::as_u64).unwrap_or(0xFF);
                container |= (byte & 0xFF) << (8 * i);
            }
            Some(container)
        }
        scalar => scalar.as_u64(),
    }
}
