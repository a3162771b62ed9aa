//! Type resolution and value rendering for FIT telemetry messages.
//!
//! FIT streams carry compact numeric records whose meaning lives in a
//! separately-supplied profile. This crate turns raw field payloads into
//! named, typed, unit-bearing values:
//!
//! - **Base types**: the closed catalog of primitive wire encodings, each
//!   with an invalid-sentinel predicate ("no data" is distinct from zero)
//! - **Profile**: message and field descriptors, including subfields
//!   (value-gated reinterpretations) and components (bit-packed derived
//!   fields with optional cross-message accumulation)
//! - **Rendering**: enum labels, timestamp conversion, and scale/offset
//!   application
//! - **Assembly**: definition-message tracking and data-record decoding
//!   into queryable [`DataMessage`]s
//!
//! Framing (file headers, record headers, CRC) is out of scope; callers feed
//! the decoder already-split definition and data records.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use fitfield::{
//!     BaseType, DataMessage, DefinitionMessage, Endianness, Field,
//!     FieldDefinition, MessageDecoder, MessageType, Profile, Value,
//! };
//!
//! # fn main() -> fitfield::Result<()> {
//! let record = MessageType::new("record", 20)
//!     .field(Field::new("speed", 6, BaseType::UInt16).scale(1000.0).units("m/s"));
//! let profile = Arc::new(Profile::from_messages([record])?);
//!
//! let mut decoder = MessageDecoder::new(profile);
//! decoder.add_definition(DefinitionMessage::new(
//!     0,
//!     20,
//!     Endianness::Little,
//!     vec![FieldDefinition { def_num: 6, base_type: BaseType::UInt16, size: 2 }],
//! ));
//!
//! let message: DataMessage = decoder.decode_data(0, &[(6, &2500u16.to_le_bytes())])?;
//! assert_eq!(message.get_value("speed"), Some(&Value::Float64(2.5)));
//! # Ok(())
//! # }
//! ```

mod decode;
mod error;
mod message;
pub mod profile;
pub mod render;
pub mod types;

pub use decode::MessageDecoder;
pub use error::{FitError, Result};
pub use message::{
    DataMessage, DefinitionMessage, FieldData, FieldDefinition, FieldKey, FieldSpec, FieldSummary,
    MessageSummary,
};
pub use profile::{
    ComponentField, Field, FieldDescriptor, FieldType, MessageType, Profile, ReferenceField,
    SubField, TypeRef,
};
pub use render::{FIT_EPOCH_UNIX, render};
pub use types::{BaseType, Endianness, Value};
