//! Configuration schemas
//!
//! Named schemas validate, default, and merge configuration tables:
//! - `validate` reports every failing field at once, keyed by path
//! - `apply_defaults` fills in absent fields
//! - `merge` lays a user config over the declared defaults

mod error;
mod field;
mod registry;
mod validate;

pub use error::SchemaError;
pub use field::{CUSTOM_VALIDATION_FAILED, FieldSchema, FieldType, Fields, Validator, fields_from_value};
pub use registry::{Schema, SchemaRegistry};
pub use validate::{REQUIRED_FIELD_MISSING, ValidationErrors, validate_field, validate_type};
