//! FIT base types: the fixed catalog of primitive wire encodings.
//!
//! Each base type pairs a binary layout (byte width, signedness or format)
//! with an invalid-sentinel predicate. Decoding a field holding its type's
//! sentinel yields `None` rather than a value or an error, so "no data" stays
//! distinct from zero throughout the pipeline.
//!
//! The catalog is closed and keyed by the numeric codes carried in
//! definition records:
//!
//! | code   | name      | width | sentinel        |
//! |--------|-----------|-------|-----------------|
//! | `0x00` | `enum`    | 1     | `0xFF`          |
//! | `0x01` | `sint8`   | 1     | `0x7F`          |
//! | `0x02` | `uint8`   | 1     | `0xFF`          |
//! | `0x83` | `sint16`  | 2     | `0x7FFF`        |
//! | `0x84` | `uint16`  | 2     | `0xFFFF`        |
//! | `0x85` | `sint32`  | 4     | `0x7FFFFFFF`    |
//! | `0x86` | `uint32`  | 4     | `0xFFFFFFFF`    |
//! | `0x07` | `string`  | 1     | empty after NUL |
//! | `0x88` | `float32` | 4     | NaN             |
//! | `0x89` | `float64` | 8     | NaN             |
//! | `0x0A` | `uint8z`  | 1     | `0x00`          |
//! | `0x8B` | `uint16z` | 2     | `0x0000`        |
//! | `0x8C` | `uint32z` | 4     | `0x00000000`    |
//! | `0x0D` | `byte`    | 1     | all bytes `0xFF`|

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::types::Value;

/// Byte order declared by a definition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

/// A primitive FIT wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Enum,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    String,
    Float32,
    Float64,
    UInt8Z,
    UInt16Z,
    UInt32Z,
    Byte,
}

impl BaseType {
    /// The numeric code identifying this base type in definition records.
    pub const fn code(self) -> u8 {
        match self {
            BaseType::Enum => 0x00,
            BaseType::SInt8 => 0x01,
            BaseType::UInt8 => 0x02,
            BaseType::SInt16 => 0x83,
            BaseType::UInt16 => 0x84,
            BaseType::SInt32 => 0x85,
            BaseType::UInt32 => 0x86,
            BaseType::String => 0x07,
            BaseType::Float32 => 0x88,
            BaseType::Float64 => 0x89,
            BaseType::UInt8Z => 0x0A,
            BaseType::UInt16Z => 0x8B,
            BaseType::UInt32Z => 0x8C,
            BaseType::Byte => 0x0D,
        }
    }

    /// Look up a base type by its numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(BaseType::Enum),
            0x01 => Some(BaseType::SInt8),
            0x02 => Some(BaseType::UInt8),
            0x83 => Some(BaseType::SInt16),
            0x84 => Some(BaseType::UInt16),
            0x85 => Some(BaseType::SInt32),
            0x86 => Some(BaseType::UInt32),
            0x07 => Some(BaseType::String),
            0x88 => Some(BaseType::Float32),
            0x89 => Some(BaseType::Float64),
            0x0A => Some(BaseType::UInt8Z),
            0x8B => Some(BaseType::UInt16Z),
            0x8C => Some(BaseType::UInt32Z),
            0x0D => Some(BaseType::Byte),
            _ => None,
        }
    }

    /// Size in bytes of a single element of this type.
    pub const fn size(self) -> usize {
        match self {
            BaseType::Enum
            | BaseType::SInt8
            | BaseType::UInt8
            | BaseType::String
            | BaseType::UInt8Z
            | BaseType::Byte => 1,
            BaseType::SInt16 | BaseType::UInt16 | BaseType::UInt16Z => 2,
            BaseType::SInt32 | BaseType::UInt32 | BaseType::UInt32Z | BaseType::Float32 => 4,
            BaseType::Float64 => 8,
        }
    }

    /// Profile-facing name of this base type.
    pub const fn name(self) -> &'static str {
        match self {
            BaseType::Enum => "enum",
            BaseType::SInt8 => "sint8",
            BaseType::UInt8 => "uint8",
            BaseType::SInt16 => "sint16",
            BaseType::UInt16 => "uint16",
            BaseType::SInt32 => "sint32",
            BaseType::UInt32 => "uint32",
            BaseType::String => "string",
            BaseType::Float32 => "float32",
            BaseType::Float64 => "float64",
            BaseType::UInt8Z => "uint8z",
            BaseType::UInt16Z => "uint16z",
            BaseType::UInt32Z => "uint32z",
            BaseType::Byte => "byte",
        }
    }

    /// Decode a raw field payload into a primitive value.
    ///
    /// `bytes` is the complete payload for one field occurrence. For
    /// `string` and `byte` the whole payload is one value; for the numeric
    /// types a payload spanning several element widths decodes as
    /// [`Value::Array`] with element-wise invalid suppression. An
    /// all-invalid payload decodes to `None`.
    pub fn decode(self, bytes: &[u8], endian: Endianness) -> Result<Option<Value>> {
        match self {
            BaseType::String => Ok(decode_string(bytes)),
            BaseType::Byte => Ok(decode_byte_blob(bytes)),
            _ => {
                let size = self.size();
                if bytes.is_empty() || bytes.len() % size != 0 {
                    return Err(FitError::decode(
                        format!("base type {}", self.name()),
                        format!("payload of {} bytes is not a multiple of {size}", bytes.len()),
                    ));
                }

                if bytes.len() == size {
                    return Ok(self.decode_element(bytes, endian));
                }

                let elements: Vec<Option<Value>> = bytes
                    .chunks_exact(size)
                    .map(|chunk| self.decode_element(chunk, endian))
                    .collect();

                if elements.iter().all(Option::is_none) {
                    Ok(None)
                } else {
                    Ok(Some(Value::Array(elements)))
                }
            }
        }
    }

    /// Decode one element of exactly `self.size()` bytes, applying the
    /// invalid-sentinel predicate.
    fn decode_element(self, bytes: &[u8], endian: Endianness) -> Option<Value> {
        macro_rules! int {
            ($prim:ty, $variant:ident, $invalid:expr) => {{
                let v = match endian {
                    Endianness::Little => <$prim>::from_le_bytes(bytes.try_into().ok()?),
                    Endianness::Big => <$prim>::from_be_bytes(bytes.try_into().ok()?),
                };
                if v == $invalid { None } else { Some(Value::$variant(v)) }
            }};
        }

        match self {
            BaseType::Enum | BaseType::UInt8 => int!(u8, UInt8, u8::MAX),
            BaseType::SInt8 => int!(i8, SInt8, i8::MAX),
            BaseType::SInt16 => int!(i16, SInt16, i16::MAX),
            BaseType::UInt16 => int!(u16, UInt16, u16::MAX),
            BaseType::SInt32 => int!(i32, SInt32, i32::MAX),
            BaseType::UInt32 => int!(u32, UInt32, u32::MAX),
            BaseType::UInt8Z => int!(u8, UInt8, 0),
            BaseType::UInt16Z => int!(u16, UInt16, 0),
            BaseType::UInt32Z => int!(u32, UInt32, 0),
            BaseType::Float32 => {
                let v = match endian {
                    Endianness::Little => f32::from_le_bytes(bytes.try_into().ok()?),
                    Endianness::Big => f32::from_be_bytes(bytes.try_into().ok()?),
                };
                if v.is_nan() { None } else { Some(Value::Float32(v)) }
            }
            BaseType::Float64 => {
                let v = match endian {
                    Endianness::Little => f64::from_le_bytes(bytes.try_into().ok()?),
                    Endianness::Big => f64::from_be_bytes(bytes.try_into().ok()?),
                };
                if v.is_nan() { None } else { Some(Value::Float64(v)) }
            }
            BaseType::String | BaseType::Byte => unreachable!("handled in decode"),
        }
    }
}

/// Truncate at the first NUL byte; an empty result is absence.
fn decode_string(bytes: &[u8]) -> Option<Value> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if end == 0 {
        None
    } else {
        Some(Value::String(String::from_utf8_lossy(&bytes[..end]).into_owned()))
    }
}

/// A byte blob is absent only when every byte is `0xFF`.
fn decode_byte_blob(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() || bytes.iter().all(|&b| b == 0xFF) {
        None
    } else {
        Some(Value::Bytes(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_TYPES: [BaseType; 14] = [
        BaseType::Enum,
        BaseType::SInt8,
        BaseType::UInt8,
        BaseType::SInt16,
        BaseType::UInt16,
        BaseType::SInt32,
        BaseType::UInt32,
        BaseType::String,
        BaseType::Float32,
        BaseType::Float64,
        BaseType::UInt8Z,
        BaseType::UInt16Z,
        BaseType::UInt32Z,
        BaseType::Byte,
    ];

    #[test]
    fn codes_round_trip() {
        for base_type in ALL_TYPES {
            assert_eq!(BaseType::from_code(base_type.code()), Some(base_type));
        }
        assert_eq!(BaseType::from_code(0x42), None);
    }

    #[test]
    fn sentinel_patterns_decode_to_absence() {
        let cases: [(BaseType, &[u8]); 10] = [
            (BaseType::Enum, &[0xFF]),
            (BaseType::UInt8, &[0xFF]),
            (BaseType::SInt8, &[0x7F]),
            (BaseType::UInt16, &[0xFF, 0xFF]),
            (BaseType::SInt16, &[0xFF, 0x7F]),
            (BaseType::UInt32, &[0xFF, 0xFF, 0xFF, 0xFF]),
            (BaseType::SInt32, &[0xFF, 0xFF, 0xFF, 0x7F]),
            (BaseType::UInt8Z, &[0x00]),
            (BaseType::UInt16Z, &[0x00, 0x00]),
            (BaseType::UInt32Z, &[0x00, 0x00, 0x00, 0x00]),
        ];
        for (base_type, bytes) in cases {
            assert_eq!(base_type.decode(bytes, Endianness::Little).unwrap(), None, "{base_type:?}");
        }

        let nan32 = f32::NAN.to_le_bytes();
        assert_eq!(BaseType::Float32.decode(&nan32, Endianness::Little).unwrap(), None);
        let nan64 = f64::NAN.to_le_bytes();
        assert_eq!(BaseType::Float64.decode(&nan64, Endianness::Little).unwrap(), None);

        assert_eq!(BaseType::Byte.decode(&[0xFF, 0xFF, 0xFF], Endianness::Little).unwrap(), None);
        assert_eq!(BaseType::String.decode(&[0x00, 0x00], Endianness::Little).unwrap(), None);
    }

    #[test]
    fn non_sentinel_patterns_decode_literally() {
        assert_eq!(
            BaseType::UInt16.decode(&[0x01, 0x00], Endianness::Little).unwrap(),
            Some(Value::UInt16(1))
        );
        assert_eq!(
            BaseType::UInt16.decode(&[0x01, 0x00], Endianness::Big).unwrap(),
            Some(Value::UInt16(0x0100))
        );
        assert_eq!(
            BaseType::SInt32.decode(&[0xFE, 0xFF, 0xFF, 0xFF], Endianness::Little).unwrap(),
            Some(Value::SInt32(-2))
        );
        assert_eq!(
            BaseType::String.decode(b"run\0\0", Endianness::Little).unwrap(),
            Some(Value::String("run".into()))
        );
        assert_eq!(
            BaseType::Byte.decode(&[0x12, 0xFF], Endianness::Little).unwrap(),
            Some(Value::Bytes(vec![0x12, 0xFF]))
        );
    }

    #[test]
    fn multi_element_payload_decodes_as_array() {
        let decoded = BaseType::UInt16
            .decode(&[0x01, 0x00, 0xFF, 0xFF, 0x03, 0x00], Endianness::Little)
            .unwrap();
        assert_eq!(
            decoded,
            Some(Value::Array(vec![Some(Value::UInt16(1)), None, Some(Value::UInt16(3))]))
        );
    }

    #[test]
    fn misaligned_payload_is_an_error() {
        let result = BaseType::UInt32.decode(&[0x01, 0x00, 0x00], Endianness::Little);
        assert!(result.is_err());
    }

    proptest! {
        // The sentinel predicate is total: decoding never panics, and the
        // result is absent exactly when the pattern is the sentinel.
        #[test]
        fn prop_uint16_decode_matches_literal_interpretation(bytes in any::<[u8; 2]>()) {
            let decoded = BaseType::UInt16.decode(&bytes, Endianness::Little).unwrap();
            let literal = u16::from_le_bytes(bytes);
            if literal == u16::MAX {
                prop_assert_eq!(decoded, None);
            } else {
                prop_assert_eq!(decoded, Some(Value::UInt16(literal)));
            }
        }

        #[test]
        fn prop_sint8_sentinel_is_only_absence(byte in any::<u8>()) {
            let decoded = BaseType::SInt8.decode(&[byte], Endianness::Little).unwrap();
            if byte == 0x7F {
                prop_assert_eq!(decoded, None);
            } else {
                prop_assert_eq!(decoded, Some(Value::SInt8(byte as i8)));
            }
        }

        #[test]
        fn prop_zero_variant_absence_differs_from_plain(v in any::<u16>()) {
            let bytes = v.to_le_bytes();
            let plain = BaseType::UInt16.decode(&bytes, Endianness::Little).unwrap();
            let zeroed = BaseType::UInt16Z.decode(&bytes, Endianness::Little).unwrap();
            prop_assert_eq!(plain.is_none(), v == u16::MAX);
            prop_assert_eq!(zeroed.is_none(), v == 0);
        }
    }
}
