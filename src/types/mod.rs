//! Core types for decoded FIT field values.
//!
//! - [`BaseType`] is the fixed catalog of primitive wire encodings, each
//!   with a decode rule and an invalid-sentinel predicate
//! - [`Value`] is the runtime representation of a decoded field
//! - [`Endianness`] carries the byte order a definition record declared
//!
//! The registry is immutable, process-wide state: every [`BaseType`] is a
//! copyable enum variant, safe to share across concurrent decodes.

mod base_type;
mod value;

pub use base_type::{BaseType, Endianness};
pub use value::Value;
