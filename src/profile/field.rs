//! Field descriptors: how a raw decoded value maps to a named, unit-bearing
//! semantic value.
//!
//! A [`Field`] is a typed slot in a message. It may carry [`SubField`]s,
//! alternate interpretations gated on the values of other fields in the same
//! message, and [`ComponentField`]s, bit-sliced extractions that synthesize
//! additional fields from one container value.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{BaseType, Value};

/// An enumerated semantic type: a base type plus a table mapping decoded
/// integers to display labels.
#[derive(Debug, Clone)]
pub struct FieldType {
    pub name: String,
    pub base_type: BaseType,
    pub values: HashMap<u64, String>,
}

impl FieldType {
    pub fn new(name: impl Into<String>, base_type: BaseType) -> Self {
        Self { name: name.into(), base_type, values: HashMap::new() }
    }

    /// Add an enum label to the table.
    pub fn value(mut self, raw: u64, label: impl Into<String>) -> Self {
        self.values.insert(raw, label.into());
        self
    }
}

/// The declared type of a field or subfield: a bare base type, or a named
/// [`FieldType`] carrying an enum table.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Base(BaseType),
    Named(Arc<FieldType>),
}

impl TypeRef {
    /// The wire encoding underlying this type.
    pub fn base_type(&self) -> BaseType {
        match self {
            TypeRef::Base(base_type) => *base_type,
            TypeRef::Named(field_type) => field_type.base_type,
        }
    }

    /// The type's name, used to select custom converters.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Base(base_type) => base_type.name(),
            TypeRef::Named(field_type) => &field_type.name,
        }
    }

    /// Look up the enum label for a raw value, when this type carries a
    /// table and the value is a key in it.
    pub fn label_for(&self, raw: &Value) -> Option<&str> {
        match self {
            TypeRef::Base(_) => None,
            TypeRef::Named(field_type) => {
                let key = raw.as_u64()?;
                field_type.values.get(&key).map(String::as_str)
            }
        }
    }
}

impl From<BaseType> for TypeRef {
    fn from(base_type: BaseType) -> Self {
        TypeRef::Base(base_type)
    }
}

impl From<Arc<FieldType>> for TypeRef {
    fn from(field_type: Arc<FieldType>) -> Self {
        TypeRef::Named(field_type)
    }
}

/// One constraint gating a [`SubField`]: the named reference field must hold
/// `raw_value` in the message being decoded.
#[derive(Debug, Clone)]
pub struct ReferenceField {
    pub name: String,
    pub def_num: u8,
    pub raw_value: Value,
}

impl ReferenceField {
    pub fn new(name: impl Into<String>, def_num: u8, raw_value: Value) -> Self {
        Self { name: name.into(), def_num, raw_value }
    }
}

/// A derived field carved out of a container value by bit-slicing.
#[derive(Debug, Clone)]
pub struct ComponentField {
    /// Name of the target field (must exist in the same message type).
    pub name: String,
    /// Definition number of the target field.
    pub def_num: u8,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub units: Option<String>,
    /// Carry the running total across messages so narrow counters survive
    /// wraparound.
    pub accumulate: bool,
    pub bits: u8,
    pub bit_offset: u8,
}

impl ComponentField {
    pub fn new(name: impl Into<String>, def_num: u8, bits: u8, bit_offset: u8) -> Self {
        Self {
            name: name.into(),
            def_num,
            scale: None,
            offset: None,
            units: None,
            accumulate: false,
            bits,
            bit_offset,
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn accumulate(mut self) -> Self {
        self.accumulate = true;
        self
    }

    /// Extract this component's raw value from a normalized container.
    /// The container is never mutated; sibling components see the same bits.
    pub fn extract(&self, container: u64) -> u64 {
        let shifted = container >> self.bit_offset;
        if self.bits >= 64 { shifted } else { shifted & ((1u64 << self.bits) - 1) }
    }
}

/// An alternate interpretation of a field, active only when every one of its
/// reference constraints matches the message's already-decoded raw values.
#[derive(Debug, Clone)]
pub struct SubField {
    pub name: String,
    pub def_num: u8,
    pub type_ref: TypeRef,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub units: Option<String>,
    pub ref_fields: Vec<ReferenceField>,
    pub components: Vec<ComponentField>,
}

impl SubField {
    pub fn new(name: impl Into<String>, def_num: u8, type_ref: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            def_num,
            type_ref: type_ref.into(),
            scale: None,
            offset: None,
            units: None,
            ref_fields: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn reference(mut self, reference: ReferenceField) -> Self {
        self.ref_fields.push(reference);
        self
    }

    pub fn component(mut self, component: ComponentField) -> Self {
        self.components.push(component);
        self
    }

    /// Whether every reference constraint matches the given raw values.
    /// `raw_values` holds `(def_num, raw value)` for the message's stream
    /// fields in decode order.
    pub fn matches(&self, raw_values: &[(u8, Option<Value>)]) -> bool {
        self.ref_fields.iter().all(|reference| {
            raw_values.iter().any(|(def_num, raw)| {
                *def_num == reference.def_num && raw.as_ref() == Some(&reference.raw_value)
            })
        })
    }
}

/// A named, typed slot in a message.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub def_num: u8,
    pub type_ref: TypeRef,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub units: Option<String>,
    pub components: Vec<ComponentField>,
    pub subfields: Vec<SubField>,
}

impl Field {
    pub fn new(name: impl Into<String>, def_num: u8, type_ref: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            def_num,
            type_ref: type_ref.into(),
            scale: None,
            offset: None,
            units: None,
            components: Vec::new(),
            subfields: Vec::new(),
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn component(mut self, component: ComponentField) -> Self {
        self.components.push(component);
        self
    }

    pub fn subfield(mut self, subfield: SubField) -> Self {
        self.subfields.push(subfield);
        self
    }

    /// The wire encoding underlying this field's declared type.
    pub fn base_type(&self) -> BaseType {
        self.type_ref.base_type()
    }

    /// Resolve which interpretation applies given the message's decoded raw
    /// values: the first subfield whose constraints all match, in
    /// declaration order, or the field itself when none match.
    ///
    /// Evaluated per-occurrence; reference fields must already have been
    /// decoded (stream order determines availability).
    pub fn resolve_subfield(&self, raw_values: &[(u8, Option<Value>)]) -> Option<usize> {
        self.subfields.iter().position(|subfield| subfield.matches(raw_values))
    }
}

/// Common read-only view over [`Field`] and [`SubField`], used by the
/// rendering pipeline so both run through the same path.
pub trait FieldDescriptor {
    fn name(&self) -> &str;
    fn def_num(&self) -> u8;
    fn type_ref(&self) -> &TypeRef;
    fn scale(&self) -> Option<f64>;
    fn offset(&self) -> Option<f64>;
    fn units(&self) -> Option<&str>;
    fn components(&self) -> &[ComponentField];
}

impl FieldDescriptor for Field {
    fn name(&self) -> &str {
        &self.name
    }
    fn def_num(&self) -> u8 {
        self.def_num
    }
    fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }
    fn scale(&self) -> Option<f64> {
        self.scale
    }
    fn offset(&self) -> Option<f64> {
        self.offset
    }
    fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }
    fn components(&self) -> &[ComponentField] {
        &self.components
    }
}

impl FieldDescriptor for SubField {
    fn name(&self) -> &str {
        &self.name
    }
    fn def_num(&self) -> u8 {
        self.def_num
    }
    fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }
    fn scale(&self) -> Option<f64> {
        self.scale
    }
    fn offset(&self) -> Option<f64> {
        self.offset
    }
    fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }
    fn components(&self) -> &[ComponentField] {
        &self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn component_extracts_bit_range() {
        // Container 0x1234: bits [4, 12) hold 0x23.
        let component = ComponentField::new("speed", 6, 8, 4);
        assert_eq!(component.extract(0x1234), 0x23);
    }

    #[test]
    fn sibling_components_see_the_same_container() {
        let low = ComponentField::new("low", 0, 8, 0);
        let high = ComponentField::new("high", 1, 8, 8);
        let container = 0xABCD;
        assert_eq!(low.extract(container), 0xCD);
        assert_eq!(high.extract(container), 0xAB);
        assert_eq!(low.extract(container), 0xCD);
    }

    #[test]
    fn subfield_requires_every_reference_to_match() {
        let subfield = SubField::new("gear", 3, BaseType::UInt8)
            .reference(ReferenceField::new("sport", 0, Value::UInt8(2)))
            .reference(ReferenceField::new("event", 1, Value::UInt8(5)));

        let both = [(0u8, Some(Value::UInt8(2))), (1, Some(Value::UInt8(5)))];
        let one = [(0u8, Some(Value::UInt8(2))), (1, Some(Value::UInt8(9)))];
        let absent = [(0u8, None), (1, Some(Value::UInt8(5)))];

        assert!(subfield.matches(&both));
        assert!(!subfield.matches(&one));
        assert!(!subfield.matches(&absent));
    }

    #[test]
    fn first_matching_subfield_wins() {
        let field = Field::new("data", 2, BaseType::UInt16)
            .subfield(
                SubField::new("cycling_cadence", 2, BaseType::UInt16)
                    .reference(ReferenceField::new("sport", 0, Value::UInt8(2))),
            )
            .subfield(
                SubField::new("running_cadence", 2, BaseType::UInt16)
                    .reference(ReferenceField::new("sport", 0, Value::UInt8(1))),
            );

        let running = [(0u8, Some(Value::UInt8(1)))];
        let idx = field.resolve_subfield(&running).unwrap();
        assert_eq!(field.subfields[idx].name, "running_cadence");

        let other = [(0u8, Some(Value::UInt8(7)))];
        assert_eq!(field.resolve_subfield(&other), None);
    }

    #[test]
    fn enum_table_lookup_uses_raw_integer() {
        let sport = Arc::new(
            FieldType::new("sport", BaseType::Enum).value(1, "running").value(2, "cycling"),
        );
        let type_ref = TypeRef::Named(sport);
        assert_eq!(type_ref.label_for(&Value::UInt8(1)), Some("running"));
        assert_eq!(type_ref.label_for(&Value::UInt8(9)), None);
        assert_eq!(type_ref.label_for(&Value::String("running".into())), None);
    }

    proptest! {
        #[test]
        fn prop_extract_masks_to_declared_width(
            container in any::<u64>(),
            bits in 1u8..=32,
            bit_offset in 0u8..=31,
        ) {
            let component = ComponentField::new("c", 0, bits, bit_offset);
            let extracted = component.extract(container);
            prop_assert!(extracted <= (1u64 << bits) - 1);
            prop_assert_eq!(extracted, (container >> bit_offset) & ((1u64 << bits) - 1));
        }
    }
}
