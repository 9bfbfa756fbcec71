//! Tool registry and argument validation error types.

use thiserror::Error;

/// An argument failed its tool's input schema.
///
/// Every variant names the offending field. Nested fields use a dotted path
/// (`content.title`) and array elements an indexed one (`prompts[3]`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field was absent (or `null`).
    #[error("missing required field: '{field}'")]
    MissingField { field: String },

    /// The value has the wrong JSON type and could not be coerced.
    #[error("field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: String,
    },

    /// A numeric value fell outside its declared bounds.
    #[error("field '{field}' is out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    /// An enum value is not one of the allowed values.
    #[error("field '{field}' must be one of [{}], got '{value}'", allowed.join(", "))]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// An array or string violated a declared length bound.
    #[error("field '{field}' has invalid length: {reason}")]
    InvalidLength { field: String, reason: String },
}

impl ValidationError {
    /// The path of the field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::TypeMismatch { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::NotAllowed { field, .. }
            | Self::InvalidLength { field, .. } => field,
        }
    }
}

/// Errors raised by the tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No tool with this name is registered.
    #[error("unknown tool: '{name}'")]
    NotFound { name: String },

    /// Two definitions in one table share a name.
    #[error("duplicate tool definition: '{name}'")]
    DuplicateTool { name: String },
}
