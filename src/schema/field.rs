use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::SchemaError;
use crate::value::{Key, Value};

/// Named fields of a record; also the body of a schema definition
pub type Fields = BTreeMap<String, FieldSchema>;

/// Custom check run after the structural checks pass
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Message used when a predicate check fails without saying why
pub const CUSTOM_VALIDATION_FAILED: &str = "Custom validation failed";

/// Expected kind of a field
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Function,
    Any,
    /// Record, optionally with a nested schema
    Table(Option<Fields>),
    /// Array, optionally with a schema every element must satisfy
    Array(Option<Box<FieldSchema>>),
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Function => "function",
            FieldType::Any => "any",
            FieldType::Table(_) => "table",
            FieldType::Array(_) => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration of a single configuration field
#[derive(Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub validator: Option<Validator>,
    pub description: Option<String>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            validator: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn function() -> Self {
        Self::new(FieldType::Function)
    }

    pub fn any() -> Self {
        Self::new(FieldType::Any)
    }

    /// Table with no declared shape
    pub fn table() -> Self {
        Self::new(FieldType::Table(None))
    }

    /// Table with nested fields
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldSchema)>,
        S: Into<String>,
    {
        Self::new(FieldType::Table(Some(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Array with no element schema
    pub fn array() -> Self {
        Self::new(FieldType::Array(None))
    }

    pub fn array_of(items: FieldSchema) -> Self {
        Self::new(FieldType::Array(Some(Box::new(items))))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Attach a validator that reports its own message
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Attach a predicate; `false` yields the generic failure message
    pub fn check<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validator(move |value| {
            if predicate(value) {
                Ok(())
            } else {
                Err(CUSTOM_VALIDATION_FAILED.to_string())
            }
        })
    }

    /// Nested fields, when this is a record with a declared shape
    pub fn fields(&self) -> Option<&Fields> {
        match &self.field_type {
            FieldType::Table(fields) => fields.as_ref(),
            _ => None,
        }
    }

    /// Parse a field declaration from a table such as
    /// `{type = "number", required = true, default = 8080}`
    pub fn from_value(path: &str, value: &Value) -> Result<Self, SchemaError> {
        let malformed = |reason: String| SchemaError::Malformed {
            field: path.to_string(),
            reason,
        };

        let table = value
            .as_table()
            .ok_or_else(|| malformed(format!("expected table, got {}", value.type_name())))?;

        let type_name = match table.get("type") {
            Value::Nil => "any",
            Value::String(s) => s.as_str(),
            other => return Err(malformed(format!("'type' must be a string, got {}", other.type_name()))),
        };

        let field_type = match type_name {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "function" => FieldType::Function,
            "any" => FieldType::Any,
            "table" | "record" => match table.get("fields") {
                Value::Nil => FieldType::Table(None),
                nested => FieldType::Table(Some(fields_from_value(path, nested)?)),
            },
            "array" => match table.get("items") {
                Value::Nil => FieldType::Array(None),
                items => {
                    let item_path = format!("{path}[]");
                    FieldType::Array(Some(Box::new(FieldSchema::from_value(&item_path, items)?)))
                }
            },
            other => return Err(malformed(format!("unknown type '{other}'"))),
        };

        let mut field = FieldSchema::new(field_type);

        match table.get("required") {
            Value::Nil => {}
            Value::Bool(b) => field.required = *b,
            other => return Err(malformed(format!("'required' must be a boolean, got {}", other.type_name()))),
        }

        match table.get("default") {
            Value::Nil => {}
            default => field.default = Some(default.clone()),
        }

        match table.get("description") {
            Value::Nil => {}
            Value::String(s) => field.description = Some(s.clone()),
            other => return Err(malformed(format!("'description' must be a string, got {}", other.type_name()))),
        }

        match table.get("validator") {
            Value::Nil => {}
            Value::Function(f) => {
                let f = f.clone();
                field.validator = Some(Arc::new(move |value: &Value| {
                    match f.call(std::slice::from_ref(value)) {
                        Ok(Value::Bool(false)) => Err(CUSTOM_VALIDATION_FAILED.to_string()),
                        Ok(Value::String(message)) => Err(message),
                        Ok(_) => Ok(()),
                        Err(err) => Err(format!("{err:#}")),
                    }
                }));
            }
            other => return Err(malformed(format!("'validator' must be a function, got {}", other.type_name()))),
        }

        Ok(field)
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("field_type", &self.field_type)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validator", &self.validator.as_ref().map(|_| "<function>"))
            .field("description", &self.description)
            .finish()
    }
}

/// Parse a `{name = field_decl, ...}` table into [`Fields`]
pub fn fields_from_value(path: &str, value: &Value) -> Result<Fields, SchemaError> {
    let table = value.as_table().ok_or_else(|| SchemaError::Malformed {
        field: path.to_string(),
        reason: format!("fields must be a table, got {}", value.type_name()),
    })?;

    let mut fields = Fields::new();
    for (key, decl) in table {
        let name = match key {
            Key::Str(s) => s.clone(),
            Key::Int(_) => {
                return Err(SchemaError::Malformed {
                    field: path.to_string(),
                    reason: format!("field names must be strings, got {key}"),
                });
            }
        };
        let field_path = if path.is_empty() {
            name.clone()
        } else {
            format!("{path}.{name}")
        };
        fields.insert(name, FieldSchema::from_value(&field_path, decl)?);
    }
    Ok(fields)
}
