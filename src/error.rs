//! Error types for FIT field decoding.
//!
//! Absent values are not errors in this crate: a field holding its base
//! type's invalid marker decodes to `None` and flows through rendering and
//! message assembly unchanged. The variants here cover genuine contract
//! violations, such as a malformed profile or a data record that does not
//! match its definition.

use thiserror::Error;

/// Result type alias for decoding operations.
pub type Result<T, E = FitError> = std::result::Result<T, E>;

/// Main error type for FIT field decoding.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FitError {
    /// A profile definition violates its own contract, such as a component
    /// whose declared bit range exceeds its container's width. Surfaced by
    /// [`Profile::validate`](crate::profile::Profile::validate) before any
    /// message is decoded.
    #[error("Profile error in {context}: {details}")]
    Profile { context: String, details: String },

    /// A data record does not match the structure its definition declared.
    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    /// A data record arrived for a local message slot with no active
    /// definition.
    #[error("No definition registered for local message slot {local_mesg_num}")]
    UnknownLocalMessage { local_mesg_num: u8 },

    /// A raw field payload does not have the byte length its field
    /// definition declared.
    #[error("Field {def_num} payload is {actual} bytes, definition declares {expected}")]
    FieldLength { def_num: u8, expected: usize, actual: usize },
}

impl FitError {
    /// Helper constructor for profile contract violations.
    pub fn profile(context: impl Into<String>, details: impl Into<String>) -> Self {
        FitError::Profile { context: context.into(), details: details.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        FitError::Decode { context: context.into(), details: details.into() }
    }
}
