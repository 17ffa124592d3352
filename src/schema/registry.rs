//! Named, write-once schema definitions

use std::collections::BTreeMap;

use super::field::{Fields, fields_from_value};
use super::validate::{REQUIRED_FIELD_MISSING, ValidationErrors, validate_field};
use super::SchemaError;
use crate::value::{self, Table, Value};

/// A named set of field declarations
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub fields: Fields,
}

/// Registry of schema definitions
///
/// Schemas are permissive: fields present in a config but absent from the
/// schema are ignored.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a schema. Defining an existing name fails.
    pub fn define(&mut self, name: &str, fields: Fields) -> Result<(), SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if self.schemas.contains_key(name) {
            return Err(SchemaError::AlreadyDefined(name.to_string()));
        }
        tracing::debug!(schema = name, fields = fields.len(), "defined schema");
        self.schemas.insert(
            name.to_string(),
            Schema {
                name: name.to_string(),
                fields,
            },
        );
        Ok(())
    }

    /// Define a schema from a `{field = decl, ...}` table
    pub fn define_value(&mut self, name: &str, fields: &Value) -> Result<(), SchemaError> {
        let fields = fields_from_value("", fields)?;
        self.define(name, fields)
    }

    /// Copy of the named schema
    pub fn get(&self, name: &str) -> Option<Schema> {
        self.schemas.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Check `config` against every declared field
    pub fn validate(&self, name: &str, config: &Value) -> Result<(), SchemaError> {
        let schema = self.lookup(name)?;
        let table = as_config_table(name, config)?;

        let mut errors = ValidationErrors::new();
        for (field_name, field) in &schema.fields {
            match table.get(field_name.as_str()) {
                Value::Nil => {
                    if field.required {
                        errors.insert(field_name.as_str(), REQUIRED_FIELD_MISSING);
                    }
                }
                value => validate_field(value, field, field_name, &mut errors),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                schema: name.to_string(),
                errors,
            })
        }
    }

    /// Copy of `config` with declared defaults filled in wherever a value is absent
    pub fn apply_defaults(&self, name: &str, config: &Value) -> Result<Value, SchemaError> {
        let schema = self.lookup(name)?;
        let mut table = as_config_table(name, config)?.clone();
        fill_defaults(&mut table, &schema.fields);
        Ok(Value::Table(table))
    }

    /// Declared defaults with `user` merged on top
    ///
    /// Only fields that declare a `default` contribute; a record without one
    /// is not synthesized from its nested defaults. User values win at any
    /// depth; records merge recursively and arrays replace.
    pub fn merge(&self, name: &str, user: &Value) -> Result<Value, SchemaError> {
        let schema = self.lookup(name)?;
        let user = as_config_table(name, user)?;
        let defaults = defaults_of(&schema.fields);
        Ok(value::deep_merge(&Value::Table(defaults), &Value::Table(user.clone())))
    }

    fn lookup(&self, name: &str) -> Result<&Schema, SchemaError> {
        self.schemas
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }
}

fn as_config_table<'a>(schema: &str, config: &'a Value) -> Result<&'a Table, SchemaError> {
    static EMPTY: std::sync::LazyLock<Table> = std::sync::LazyLock::new(Table::new);
    match config {
        Value::Table(t) => Ok(t),
        Value::Nil => Ok(&EMPTY),
        other => Err(SchemaError::NotATable {
            schema: schema.to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn fill_defaults(table: &mut Table, fields: &Fields) {
    for (name, field) in fields {
        match table.get_mut(name.as_str()) {
            None => {
                if let Some(default) = &field.default {
                    table.insert(name.as_str(), value::deep_copy(default));
                }
            }
            Some(Value::Table(nested)) => {
                if let Some(nested_fields) = field.fields() {
                    fill_defaults(nested, nested_fields);
                }
            }
            Some(_) => {}
        }
    }
}

/// Top-level declared defaults; fields without one are skipped
fn defaults_of(fields: &Fields) -> Table {
    fields
        .iter()
        .filter_map(|(name, field)| {
            field
                .default
                .as_ref()
                .map(|default| (name.as_str(), value::deep_copy(default)))
        })
        .collect()
}
