use thiserror::Error;

use super::ValidationErrors;

/// Errors from the schema registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Schema names must be non-empty.
    #[error("schema name must not be empty")]
    EmptyName,

    /// Schemas are write-once.
    #[error("schema already defined: {0}")]
    AlreadyDefined(String),

    #[error("schema not found: {0}")]
    NotFound(String),

    /// A field declaration could not be parsed.
    #[error("malformed field '{field}': {reason}")]
    Malformed {
        /// Path of the offending field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The configuration handed to the schema was not a table.
    #[error("config for schema '{schema}' must be a table, got {found}")]
    NotATable {
        /// Schema name.
        schema: String,
        /// Type name of the value received.
        found: String,
    },

    /// One or more fields failed validation.
    #[error("invalid config for schema '{schema}':\n{errors}")]
    Invalid {
        /// Schema name.
        schema: String,
        /// Every failure, keyed by field path.
        errors: ValidationErrors,
    },
}

impl SchemaError {
    /// Field errors, when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            SchemaError::Invalid { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
