//! Decoded message records and their accessors.
//!
//! A [`DefinitionMessage`] declares the field layout for a local message
//! slot; every following [`DataMessage`] of that slot references it (not a
//! copy) until the slot is redefined. A [`DataMessage`] owns one
//! [`FieldData`] per decoded field occurrence, immutable once assembled,
//! and exposes dictionary-style and iteration access.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::profile::{Field, FieldDescriptor};
use crate::types::{BaseType, Endianness, Value};

/// One field's position and wire encoding as declared in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub def_num: u8,
    pub base_type: BaseType,
    /// Declared payload size in bytes (may span several base type elements).
    pub size: u8,
}

impl FieldDefinition {
    /// Build from the raw triple a definition record carries. Unknown base
    /// type codes decode as `byte` rather than failing the definition.
    pub fn from_wire(def_num: u8, base_type_code: u8, size: u8) -> Self {
        let base_type = BaseType::from_code(base_type_code).unwrap_or_else(|| {
            warn!(def_num, base_type_code, "Unknown base type code, decoding as byte");
            BaseType::Byte
        });
        Self { def_num, base_type, size }
    }
}

/// Declares, for a local message slot, the ordered field encodings that
/// subsequent data records of that slot will use.
#[derive(Debug, Clone)]
pub struct DefinitionMessage {
    pub local_mesg_num: u8,
    /// Global message number, resolved against the profile at decode time.
    pub mesg_num: u16,
    pub endian: Endianness,
    pub field_defs: Vec<FieldDefinition>,
}

impl DefinitionMessage {
    pub fn new(
        local_mesg_num: u8,
        mesg_num: u16,
        endian: Endianness,
        field_defs: Vec<FieldDefinition>,
    ) -> Self {
        Self { local_mesg_num, mesg_num, endian, field_defs }
    }
}

/// The semantic descriptor behind one [`FieldData`]: the field itself, or
/// one of its subfields when reference constraints selected it.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    Field(Arc<Field>),
    /// `index` is the position in `parent.subfields`. Subfield resolution
    /// always produces an in-bounds index; a hand-built out-of-range index
    /// resolves to the parent field rather than panicking.
    SubField { parent: Arc<Field>, index: usize },
}

impl FieldSpec {
    /// The descriptor view used by rendering.
    pub fn descriptor(&self) -> &dyn FieldDescriptor {
        match self {
            FieldSpec::Field(field) => field.as_ref(),
            FieldSpec::SubField { parent, index } => match parent.subfields.get(*index) {
                Some(subfield) => subfield,
                None => parent.as_ref(),
            },
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor().name()
    }

    pub fn def_num(&self) -> u8 {
        self.descriptor().def_num()
    }

    /// The parent field, for the subfield case.
    pub fn parent(&self) -> Option<&Arc<Field>> {
        match self {
            FieldSpec::Field(_) => None,
            FieldSpec::SubField { parent, .. } => Some(parent),
        }
    }
}

/// Lookup key for field accessors: a field answers to its name or to any of
/// its numeric aliases.
#[derive(Debug, Clone, Copy)]
pub enum FieldKey<'a> {
    Name(&'a str),
    Num(u8),
}

impl<'a> From<&'a str> for FieldKey<'a> {
    fn from(name: &'a str) -> Self {
        FieldKey::Name(name)
    }
}

impl From<u8> for FieldKey<'_> {
    fn from(def_num: u8) -> Self {
        FieldKey::Num(def_num)
    }
}

/// The decode result for one occurrence of a field within one message.
///
/// `field_def` is absent for dynamically-introduced fields (component
/// expansion); `field` is absent when the profile has no descriptor for the
/// stream field. At least one of the two is always present.
#[derive(Debug, Clone)]
pub struct FieldData {
    pub field_def: Option<FieldDefinition>,
    pub field: Option<FieldSpec>,
    /// The declaring field for component-synthesized entries, or the parent
    /// field when a subfield was selected.
    pub parent_field: Option<Arc<Field>>,
    pub value: Option<Value>,
    pub raw_value: Option<Value>,
    units: Option<String>,
}

impl FieldData {
    pub(crate) fn new(
        field_def: Option<FieldDefinition>,
        field: Option<FieldSpec>,
        parent_field: Option<Arc<Field>>,
        value: Option<Value>,
        raw_value: Option<Value>,
        units: Option<String>,
    ) -> Self {
        Self { field_def, field, parent_field, value, raw_value, units }
    }

    /// The resolved field name, if the profile knows this field.
    pub fn name(&self) -> Option<&str> {
        self.field.as_ref().map(FieldSpec::name)
    }

    /// The definition number, preferring the dynamic field's over the
    /// stream definition's (dynamic fields have no stream definition).
    pub fn def_num(&self) -> Option<u8> {
        self.field
            .as_ref()
            .map(FieldSpec::def_num)
            .or_else(|| self.field_def.as_ref().map(|field_def| field_def.def_num))
    }

    /// The wire encoding: the stream definition's base type, or the
    /// semantic field's for dynamically-introduced entries.
    pub fn base_type(&self) -> Option<BaseType> {
        self.field_def
            .as_ref()
            .map(|field_def| field_def.base_type)
            .or_else(|| self.field.as_ref().map(|field| field.descriptor().type_ref().base_type()))
    }

    /// The semantic type name (falls back to the base type's name).
    pub fn type_name(&self) -> Option<&str> {
        self.field
            .as_ref()
            .map(|field| field.descriptor().type_ref().name())
            .or_else(|| self.base_type().map(BaseType::name))
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Identity lookup: matches the field's own name or number, its parent
    /// field's, or the stream definition's number. The same field may
    /// answer to several aliases.
    pub fn is_named<'a>(&self, key: impl Into<FieldKey<'a>>) -> bool {
        let key = key.into();
        if let Some(field) = &self.field {
            match key {
                FieldKey::Name(name) => {
                    if field.name() == name {
                        return true;
                    }
                }
                FieldKey::Num(def_num) => {
                    if field.def_num() == def_num {
                        return true;
                    }
                }
            }
        }
        if let Some(parent) = &self.parent_field {
            match key {
                FieldKey::Name(name) => {
                    if parent.name == name {
                        return true;
                    }
                }
                FieldKey::Num(def_num) => {
                    if parent.def_num == def_num {
                        return true;
                    }
                }
            }
        }
        if let Some(field_def) = &self.field_def {
            if let FieldKey::Num(def_num) = key {
                if field_def.def_num == def_num {
                    return true;
                }
            }
        }
        false
    }

    /// Whether this entry's defining field declares no components (pure
    /// leaf). Unresolved fields count as leaves.
    pub fn is_leaf(&self) -> bool {
        self.field
            .as_ref()
            .map(|field| field.descriptor().components().is_empty())
            .unwrap_or(true)
    }

    /// Stable structural record for reporting and serialization.
    pub fn as_summary(&self) -> FieldSummary {
        FieldSummary {
            name: self.name().map(str::to_owned),
            def_num: self.def_num(),
            base_type: self.base_type().map(BaseType::name),
            type_name: self.type_name().map(str::to_owned),
            units: self.units.clone(),
            value: self.value.clone(),
            raw_value: self.raw_value.clone(),
        }
    }
}

/// Serializable snapshot of one [`FieldData`].
#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub name: Option<String>,
    pub def_num: Option<u8>,
    pub base_type: Option<&'static str>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub units: Option<String>,
    pub value: Option<Value>,
    pub raw_value: Option<Value>,
}

/// Serializable snapshot of a whole [`DataMessage`].
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub name: Option<String>,
    pub mesg_num: u16,
    pub fields: Vec<FieldSummary>,
}

/// One decoded data record.
#[derive(Debug, Clone)]
pub struct DataMessage {
    definition: Arc<DefinitionMessage>,
    name: Option<String>,
    fields: Vec<FieldData>,
}

impl DataMessage {
    pub(crate) fn new(
        definition: Arc<DefinitionMessage>,
        name: Option<String>,
        fields: Vec<FieldData>,
    ) -> Self {
        Self { definition, name, fields }
    }

    /// The message name, when the profile knows this message number.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mesg_num(&self) -> u16 {
        self.definition.mesg_num
    }

    /// The definition record this message was decoded against.
    pub fn definition(&self) -> &Arc<DefinitionMessage> {
        &self.definition
    }

    /// Every decoded field occurrence, in stream/expansion order.
    pub fn fields(&self) -> &[FieldData] {
        &self.fields
    }

    /// The first field (in stored order) answering to `key`.
    pub fn get<'a>(&self, key: impl Into<FieldKey<'a>>) -> Option<&FieldData> {
        let key = key.into();
        self.fields.iter().find(|field_data| field_data.is_named(key))
    }

    /// Convenience unwrap of `get(key).value`.
    pub fn get_value<'a>(&self, key: impl Into<FieldKey<'a>>) -> Option<&Value> {
        self.get(key).and_then(|field_data| field_data.value.as_ref())
    }

    /// Name-keyed map of all field values. Unnamed fields key by their
    /// definition number. Built in stored order, so a duplicate identifier
    /// keeps the later occurrence.
    pub fn get_values(&self) -> HashMap<String, Option<Value>> {
        let mut values = HashMap::with_capacity(self.fields.len());
        for field_data in &self.fields {
            let key = match field_data.name() {
                Some(name) => name.to_owned(),
                None => field_data.def_num().map(|n| n.to_string()).unwrap_or_default(),
            };
            values.insert(key, field_data.value.clone());
        }
        values
    }

    /// Leaf fields (those whose defining field declares no components),
    /// sorted named-before-unnamed, then by name, then by definition
    /// number. The order is deterministic across runs.
    pub fn leaf_fields(&self) -> Vec<&FieldData> {
        let mut leaves: Vec<&FieldData> =
            self.fields.iter().filter(|field_data| field_data.is_leaf()).collect();
        leaves.sort_by(|a, b| {
            let key_a = (a.name().is_none(), a.name().unwrap_or(""), a.def_num());
            let key_b = (b.name().is_none(), b.name().unwrap_or(""), b.def_num());
            key_a.cmp(&key_b)
        });
        leaves
    }

    pub fn as_summary(&self) -> MessageSummary {
        MessageSummary {
            name: self.name.clone(),
            mesg_num: self.mesg_num(),
            fields: self.fields.iter().map(FieldData::as_summary).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DataMessage {
    type Item = &'a FieldData;
    type IntoIter = std::vec::IntoIter<&'a FieldData>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaf_fields().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ComponentField, SubField};

    fn named_entry(name: &str, def_num: u8, value: Option<Value>) -> FieldData {
        let field = Arc::new(Field::new(name, def_num, BaseType::UInt8));
        FieldData::new(
            Some(FieldDefinition { def_num, base_type: BaseType::UInt8, size: 1 }),
            Some(FieldSpec::Field(field)),
            None,
            value.clone(),
            value,
            None,
        )
    }

    fn unresolved_entry(def_num: u8, value: Option<Value>) -> FieldData {
        FieldData::new(
            Some(FieldDefinition { def_num, base_type: BaseType::UInt8, size: 1 }),
            None,
            None,
            value.clone(),
            value,
            None,
        )
    }

    fn message(fields: Vec<FieldData>) -> DataMessage {
        let definition =
            Arc::new(DefinitionMessage::new(0, 20, Endianness::Little, Vec::new()));
        DataMessage::new(definition, Some("record".into()), fields)
    }

    #[test]
    fn is_named_matches_all_aliases() {
        let parent = Arc::new(Field::new("event", 0, BaseType::UInt8));
        let entry = FieldData::new(
            None,
            Some(FieldSpec::Field(Arc::new(Field::new("gear_change", 4, BaseType::UInt8)))),
            Some(parent),
            None,
            None,
            None,
        );

        assert!(entry.is_named("gear_change"));
        assert!(entry.is_named(4));
        assert!(entry.is_named("event"));
        assert!(entry.is_named(0));
        assert!(!entry.is_named("sport"));
        assert!(!entry.is_named(9));
    }

    #[test]
    fn out_of_range_subfield_index_resolves_to_parent() {
        let parent = Arc::new(
            Field::new("data", 3, BaseType::UInt16)
                .subfield(SubField::new("pace", 3, BaseType::UInt16)),
        );
        let spec = FieldSpec::SubField { parent: Arc::clone(&parent), index: 7 };
        assert_eq!(spec.name(), "data");
        assert_eq!(spec.def_num(), 3);

        let in_bounds = FieldSpec::SubField { parent, index: 0 };
        assert_eq!(in_bounds.name(), "pace");
    }

    #[test]
    fn def_num_prefers_dynamic_field_over_stream_definition() {
        let field = Arc::new(Field::new("speed", 6, BaseType::UInt16));
        let dynamic = FieldData::new(None, Some(FieldSpec::Field(field)), None, None, None, None);
        assert_eq!(dynamic.def_num(), Some(6));

        let stream = unresolved_entry(8, None);
        assert_eq!(stream.def_num(), Some(8));
    }

    #[test]
    fn get_returns_first_match_in_stored_order() {
        let msg = message(vec![
            named_entry("cadence", 4, Some(Value::UInt8(80))),
            named_entry("cadence", 4, Some(Value::UInt8(85))),
        ]);
        assert_eq!(msg.get_value("cadence"), Some(&Value::UInt8(80)));
    }

    #[test]
    fn get_values_is_last_write_wins() {
        let msg = message(vec![
            named_entry("cadence", 4, Some(Value::UInt8(80))),
            named_entry("cadence", 4, Some(Value::UInt8(85))),
        ]);
        let values = msg.get_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values["cadence"], Some(Value::UInt8(85)));
    }

    #[test]
    fn unresolved_fields_key_by_number() {
        let msg = message(vec![unresolved_entry(42, Some(Value::UInt8(3)))]);
        let values = msg.get_values();
        assert_eq!(values["42"], Some(Value::UInt8(3)));
        assert_eq!(msg.get_value(42), Some(&Value::UInt8(3)));
        assert!(msg.get("42").is_none());
    }

    #[test]
    fn leaf_iteration_sorts_named_first_then_name_then_number() {
        let container = Arc::new(
            Field::new("compressed", 8, BaseType::Byte)
                .component(ComponentField::new("speed", 6, 12, 0)),
        );
        let with_components =
            FieldData::new(None, Some(FieldSpec::Field(container)), None, None, None, None);

        let msg = message(vec![
            unresolved_entry(7, None),
            named_entry("speed", 6, None),
            with_components,
            named_entry("cadence", 4, None),
            unresolved_entry(2, None),
        ]);

        let order: Vec<Option<u8>> = msg.leaf_fields().iter().map(|f| f.def_num()).collect();
        // cadence, speed, then unnamed by number; the component container
        // is not a leaf.
        assert_eq!(order, vec![Some(4), Some(6), Some(2), Some(7)]);

        let again: Vec<Option<u8>> = (&msg).into_iter().map(|f| f.def_num()).collect();
        assert_eq!(again, order);
    }

    #[test]
    fn summary_has_stable_shape() {
        let msg = message(vec![named_entry("cadence", 4, Some(Value::UInt8(80)))]);
        let summary = msg.as_summary();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["name"], "record");
        assert_eq!(json["fields"][0]["name"], "cadence");
        assert_eq!(json["fields"][0]["def_num"], 4);
        assert_eq!(json["fields"][0]["base_type"], "uint8");
        assert_eq!(json["fields"][0]["type"], "uint8");
    }
}
