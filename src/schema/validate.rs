//! Typed validation of values against field declarations
//!
//! Errors are collected under dotted/bracketed paths (`user.name`,
//! `tags[2]`) and never short-circuit across siblings, so one call reports
//! every problem.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use super::field::{FieldSchema, FieldType};
use crate::value::{self, Value};

pub const REQUIRED_FIELD_MISSING: &str = "Required field is missing";

/// Validation failures keyed by field path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; a later message for the same path replaces the earlier one
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(path.into(), message.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, message)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{path}: {message}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Check the kind of `value` against `expected`
///
/// `any` always passes and `array` uses the array-shape test. Everything else
/// is an exact kind match; a table satisfies `table` whether or not it is
/// array-shaped.
pub fn validate_type(value: &Value, expected: &FieldType) -> Result<(), String> {
    let ok = match expected {
        FieldType::Any => true,
        FieldType::Array(_) => value::is_array(value),
        other => other.name() == value.type_name(),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("Expected {}, got {}", expected.name(), value.type_name()))
    }
}

/// Validate `value` against `schema`, recording failures under `path`
pub fn validate_field(value: &Value, schema: &FieldSchema, path: &str, errors: &mut ValidationErrors) {
    let before = errors.len();

    match &schema.field_type {
        FieldType::Any => return,
        FieldType::Array(items) => {
            if let Err(message) = validate_type(value, &schema.field_type) {
                errors.insert(path, message);
                return;
            }
            if let (Some(items), Some(table)) = (items, value.as_table()) {
                for (index, item) in table {
                    validate_field(item, items, &format!("{path}[{index}]"), errors);
                }
            }
        }
        FieldType::Table(fields) => {
            if let Err(message) = validate_type(value, &schema.field_type) {
                errors.insert(path, message);
                return;
            }
            if let (Some(fields), Some(table)) = (fields, value.as_table()) {
                for (name, field) in fields {
                    let field_path = join_path(path, name);
                    match table.get(name.as_str()) {
                        Value::Nil => {
                            if field.required {
                                errors.insert(field_path, REQUIRED_FIELD_MISSING);
                            }
                        }
                        nested => validate_field(nested, field, &field_path, errors),
                    }
                }
            }
        }
        FieldType::String | FieldType::Number | FieldType::Boolean | FieldType::Function => {
            if let Err(message) = validate_type(value, &schema.field_type) {
                errors.insert(path, message);
                return;
            }
        }
    }

    if errors.len() > before {
        return;
    }
    if let Some(validator) = &schema.validator {
        if let Err(message) = validator(value) {
            errors.insert(path, message);
        }
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
