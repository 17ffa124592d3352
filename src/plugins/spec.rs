use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::PluginError;
use crate::value::{Callable, Value};

/// Declaration of a plugin
///
/// The lazy-load fields (`lazy`, `event`, `cmd`, `ft`) are descriptive only;
/// the registry stores them for the host's loading layer and never acts on
/// them.
#[derive(Debug, Clone, Default)]
pub struct PluginSpec {
    /// Plugins that must load first, in order
    pub dependencies: Vec<String>,
    /// Runs exactly once when the plugin loads
    pub config: Option<Callable>,
    pub lazy: bool,
    /// Events that should trigger a lazy load
    pub event: Vec<String>,
    /// Commands that should trigger a lazy load
    pub cmd: Vec<String>,
    /// Filetypes that should trigger a lazy load
    pub ft: Vec<String>,
}

impl PluginSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn config<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.config = Some(Callable::from_fn(f));
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn on_event(mut self, event: impl Into<String>) -> Self {
        self.event.push(event.into());
        self
    }

    pub fn on_command(mut self, cmd: impl Into<String>) -> Self {
        self.cmd.push(cmd.into());
        self
    }

    pub fn on_filetype(mut self, ft: impl Into<String>) -> Self {
        self.ft.push(ft.into());
        self
    }

    /// Build a spec from a record-shaped table
    ///
    /// `dependencies` must be a list of names and `config` a function. The
    /// trigger fields accept a single string or a list of strings.
    pub fn from_value(plugin: &str, value: &Value) -> Result<Self, PluginError> {
        let invalid = |reason: String| PluginError::InvalidSpec {
            plugin: plugin.to_string(),
            reason,
        };

        let table = match value {
            Value::Nil => return Ok(Self::default()),
            Value::Table(t) if t.is_empty() || !t.is_array() => t,
            other => return Err(invalid(format!("spec must be a record, got {}", describe(other)))),
        };

        let mut spec = PluginSpec::new();

        match table.get("dependencies") {
            Value::Nil => {}
            Value::Table(deps) if deps.is_array() => {
                for dep in deps.values() {
                    match dep.as_str() {
                        Some(name) => spec.dependencies.push(name.to_string()),
                        None => {
                            return Err(invalid(format!(
                                "dependency names must be strings, got {}",
                                dep.type_name()
                            )));
                        }
                    }
                }
            }
            other => return Err(invalid(format!("'dependencies' must be a list, got {}", describe(other)))),
        }

        match table.get("config") {
            Value::Nil => {}
            Value::Function(f) => spec.config = Some(f.clone()),
            other => return Err(invalid(format!("'config' must be a function, got {}", other.type_name()))),
        }

        match table.get("lazy") {
            Value::Nil => {}
            Value::Bool(b) => spec.lazy = *b,
            other => return Err(invalid(format!("'lazy' must be a boolean, got {}", other.type_name()))),
        }

        spec.event = triggers(table.get("event")).map_err(|found| invalid(format!("'event' {found}")))?;
        spec.cmd = triggers(table.get("cmd")).map_err(|found| invalid(format!("'cmd' {found}")))?;
        spec.ft = triggers(table.get("ft")).map_err(|found| invalid(format!("'ft' {found}")))?;

        Ok(spec)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Table(t) if t.is_array() => "list",
        Value::Table(_) => "record",
        other => other.type_name(),
    }
}

fn triggers(value: &Value) -> Result<Vec<String>, String> {
    let bad = |v: &Value| format!("must be a string or list of strings, got {}", v.type_name());
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Table(t) if t.is_array() => t
            .values()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(|| bad(v)))
            .collect(),
        other => Err(bad(other)),
    }
}

/// Snapshot of a registered plugin
#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: String,
    pub spec: PluginSpec,
    pub loaded: bool,
}

impl Serialize for Plugin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Plugin", 8)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("loaded", &self.loaded)?;
        s.serialize_field("lazy", &self.spec.lazy)?;
        s.serialize_field("dependencies", &self.spec.dependencies)?;
        s.serialize_field("has_config", &self.spec.config.is_some())?;
        s.serialize_field("event", &self.spec.event)?;
        s.serialize_field("cmd", &self.spec.cmd)?;
        s.serialize_field("ft", &self.spec.ft)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let spec = PluginSpec::new()
            .depends_on("plenary")
            .lazy(true)
            .on_command("Telescope")
            .config(|| Ok(()));
        assert_eq!(spec.dependencies, vec!["plenary"]);
        assert!(spec.lazy);
        assert_eq!(spec.cmd, vec!["Telescope"]);
        assert!(spec.config.is_some());
    }

    #[test]
    fn test_from_value() {
        let mut value = Value::from(json!({
            "dependencies": ["plenary", "devicons"],
            "lazy": true,
            "event": "BufReadPre",
            "ft": ["rust", "lua"],
        }));
        value
            .as_table_mut()
            .unwrap()
            .insert("config", Callable::from_fn(|| Ok(())));

        let spec = PluginSpec::from_value("gitsigns", &value).unwrap();
        assert_eq!(spec.dependencies, vec!["plenary", "devicons"]);
        assert!(spec.lazy);
        assert_eq!(spec.event, vec!["BufReadPre"]);
        assert_eq!(spec.ft, vec!["rust", "lua"]);
        assert!(spec.config.is_some());
    }

    #[test]
    fn test_from_value_rejects_bad_shapes() {
        let cases = [
            (json!(["a", "b"]), "spec must be a record, got list"),
            (json!("x"), "spec must be a record, got string"),
            (json!({"dependencies": {"a": 1}}), "'dependencies' must be a list, got record"),
            (json!({"dependencies": "plenary"}), "'dependencies' must be a list, got string"),
            (json!({"dependencies": [1]}), "dependency names must be strings, got number"),
            (json!({"config": "setup"}), "'config' must be a function, got string"),
            (json!({"lazy": "yes"}), "'lazy' must be a boolean, got string"),
            (json!({"cmd": 3}), "'cmd' must be a string or list of strings, got number"),
        ];
        for (spec, reason) in cases {
            let err = PluginSpec::from_value("p", &Value::from(spec)).unwrap_err();
            assert_eq!(
                err,
                PluginError::InvalidSpec {
                    plugin: "p".into(),
                    reason: reason.into()
                }
            );
        }
    }

    #[test]
    fn test_serialize_plugin() {
        let plugin = Plugin {
            name: "lualine".into(),
            spec: PluginSpec::new().depends_on("devicons"),
            loaded: true,
        };
        assert_eq!(
            serde_json::to_value(&plugin).unwrap(),
            json!({
                "name": "lualine",
                "loaded": true,
                "lazy": false,
                "dependencies": ["devicons"],
                "has_config": false,
                "event": [],
                "cmd": [],
                "ft": [],
            })
        );
    }
}
