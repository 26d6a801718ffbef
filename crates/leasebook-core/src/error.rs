//! Error types for the reservation registry
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reservation registry
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (hardware address, IPv4 address, identifier)
    #[error("validation error: {0}")]
    Validation(String),

    /// A reservation with this identifier already exists
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// A reservation with this hardware address already exists
    #[error("duplicate hardware address: {0}")]
    DuplicateHardwareAddress(String),

    /// No reservation with this identifier
    #[error("reservation not found: {0}")]
    NotFound(String),

    /// No reservation line in the raw text matched the entry being replaced
    #[error("no reservation line found for {0}")]
    LineNotFound(String),

    /// The reservation source file could not be read
    #[error("reservation source unavailable: {0}")]
    SourceUnavailable(String),

    /// Durable write or service reload failed before the mutation took effect
    #[error("persist failed during {step}: {cause}")]
    PersistFailed {
        /// The step that failed
        step: &'static str,
        /// Underlying cause
        cause: String,
    },

    /// Some steps of a multi-step operation succeeded before a later one failed
    #[error("partially applied: {applied:?} succeeded; {failed}")]
    PartiallyApplied {
        /// Steps that completed before the failure
        applied: Vec<String>,
        /// Description of the failing step
        failed: String,
    },

    /// An external service reload reported failure
    #[error("service {service} reload failed: {message}")]
    Service {
        /// Service name
        service: String,
        /// Error message
        message: String,
    },

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound(identifier.into())
    }

    /// Create a source-unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a persist-failed error
    pub fn persist_failed(step: &'static str, cause: impl Into<String>) -> Self {
        Self::PersistFailed {
            step,
            cause: cause.into(),
        }
    }

    /// Create a partially-applied error
    pub fn partially_applied(applied: Vec<String>, failed: impl Into<String>) -> Self {
        Self::PartiallyApplied {
            applied,
            failed: failed.into(),
        }
    }

    /// Create a service-reload error
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the validation class (rejected input,
    /// no state touched) as opposed to the persistence class.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DuplicateIdentifier(_)
                | Self::DuplicateHardwareAddress(_)
                | Self::NotFound(_)
                | Self::LineNotFound(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
