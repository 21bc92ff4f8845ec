//! Validation errors raised while converting loose input into entities.

use thiserror::Error;

/// Errors raised when caller-supplied fields do not fit the task schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A status or priority string outside its enumeration.
    #[error("invalid {field}: {value:?}")]
    InvalidEnum { field: &'static str, value: String },

    /// A field name that is not an updatable task field.
    #[error("unknown or read-only field: {0}")]
    InvalidField(String),

    /// A recognized field carrying a value of the wrong shape.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ValidationError {
    /// Creates an invalid enum error.
    pub fn invalid_enum(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnum {
            field,
            value: value.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for entity validation.
pub type ValidationResult<T> = Result<T, ValidationError>;
