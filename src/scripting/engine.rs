//! The Rhai scripting engine for Lark
//!
//! Provides the `lark` namespace:
//! - `lark::config::*` - core settings
//! - `lark::plugins::*` - plugin registration
//! - `lark::events::*` - event subscriptions
//! - `lark::schema::*` - configuration schemas

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use rhai::{AST, Dynamic, Engine, Scope};

use super::ScriptError;
use super::api::{self, Declarations};
use super::convert::{Pending, PendingQueue, ScriptContext};
use super::resolver::ScriptResolver;
use crate::config::Settings;

/// Engine state shared by the init script and script modules
#[derive(Clone)]
pub(crate) struct Runner {
    pub(crate) engine: Arc<Engine>,
    declarations: Declarations,
    pending: PendingQueue,
}

impl Runner {
    pub(crate) fn context(&self, ast: AST) -> ScriptContext {
        ScriptContext::with_queues(
            Arc::clone(&self.engine),
            Arc::new(ast),
            Arc::clone(&self.declarations),
            Arc::clone(&self.pending),
        )
    }

    /// Run a script and queue what it declared
    ///
    /// A script that fails part-way queues nothing.
    pub(crate) fn run(&self, context: &ScriptContext, scope: &mut Scope) -> Result<Dynamic, ScriptError> {
        let result = self.engine.eval_ast_with_scope::<Dynamic>(scope, &context.ast);
        context.collect(result.is_ok());
        result.map_err(|e| ScriptError::Runtime(e.to_string()))
    }
}

/// The scripting engine for Lark
pub struct ScriptEngine {
    runner: Runner,
    settings: Arc<RwLock<Settings>>,
}

impl ScriptEngine {
    /// Create a new script engine with default settings
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let settings = Arc::new(RwLock::new(settings));
        let declarations = Declarations::default();
        let engine = Self::create_engine(Arc::clone(&settings), Arc::clone(&declarations));

        Self {
            runner: Runner {
                engine: Arc::new(engine),
                declarations,
                pending: PendingQueue::default(),
            },
            settings,
        }
    }

    /// Create the Rhai engine with the `lark` namespace
    fn create_engine(settings: Arc<RwLock<Settings>>, declarations: Declarations) -> Engine {
        let mut engine = Engine::new();

        // Safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        let mut lark_module = rhai::Module::new();
        lark_module.set_sub_module("config", api::config::create_module(settings));
        lark_module.set_sub_module("plugins", api::plugins::create_module(Arc::clone(&declarations)));
        lark_module.set_sub_module("events", api::events::create_module(Arc::clone(&declarations)));
        lark_module.set_sub_module("schema", api::schema::create_module(declarations));

        // Register `lark` as a static module (accessible as lark::*)
        engine.register_static_module("lark", lark_module.into());

        engine.on_print(|msg| tracing::info!(target: "lark::script", "{msg}"));
        engine.on_debug(|msg, source, pos| {
            tracing::debug!(target: "lark::script", source = source.unwrap_or("<script>"), %pos, "{msg}")
        });

        engine
    }

    /// Load and execute a script file
    pub fn load_file(&mut self, path: &Path) -> Result<(), ScriptError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.eval(&content)
    }

    /// Evaluate a script; its declarations are queued until taken
    pub fn eval(&mut self, script: &str) -> Result<(), ScriptError> {
        let ast = self
            .runner
            .engine
            .compile(script)
            .map_err(|e| ScriptError::Parse(e.to_string()))?;

        let context = self.runner.context(ast);
        self.runner.run(&context, &mut Scope::new())?;
        Ok(())
    }

    /// Drain the declarations queued by scripts and script modules
    pub(crate) fn take_pending(&self) -> Vec<Pending> {
        std::mem::take(&mut *self.runner.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// A module resolver that searches the configured module paths
    ///
    /// Modules run on this engine, so their declarations land in the same queue.
    pub fn resolver(&self) -> ScriptResolver {
        ScriptResolver::new(self.runner.clone(), self.settings_ref())
    }

    /// Get the current settings (cloned)
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn settings_ref(&self) -> Arc<RwLock<Settings>> {
        Arc::clone(&self.settings)
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::api::Declaration;

    fn engine() -> ScriptEngine {
        ScriptEngine::with_settings(Settings::empty())
    }

    #[test]
    fn test_lark_config_settings() {
        let mut engine = engine();
        engine
            .eval(
                r#"
                lark::config::add_module_path("/opt/lark/modules");
                lark::config::set_auto_load(false);
                lark::config::set_call_setup(false);
            "#,
            )
            .unwrap();

        let settings = engine.settings();
        assert_eq!(settings.module_paths, vec![std::path::PathBuf::from("/opt/lark/modules")]);
        assert!(!settings.auto_load);
        assert!(!settings.call_setup);
    }

    #[test]
    fn test_lark_config_getters() {
        let mut engine = engine();
        engine
            .eval(
                r#"
                lark::config::add_module_path("/a");
                if lark::config::module_paths().len() != 1 {
                    throw "expected one module path";
                }
                if !lark::config::get_auto_load() {
                    throw "auto load should default to true";
                }
            "#,
            )
            .unwrap();
    }

    #[test]
    fn test_declarations_are_queued() {
        let mut engine = engine();
        engine
            .eval(
                r#"
                lark::plugins::register("plenary");
                lark::plugins::register("telescope", #{ dependencies: ["plenary"] });
                lark::events::on("plugin:loaded", |name| print(name));
                lark::events::on("plugin:error", |e| (), #{ once: true, priority: 5 });
                lark::schema::define("ui", #{ border: #{ type: "string", "default": "rounded" } });
            "#,
            )
            .unwrap();

        let pending = engine.take_pending();
        assert_eq!(pending.len(), 5);
        assert!(matches!(
            &pending[3].declaration,
            Declaration::Subscribe { once: true, priority: 5, .. }
        ));
        assert!(engine.take_pending().is_empty());
    }

    #[test]
    fn test_failed_script_queues_nothing() {
        let mut engine = engine();
        let err = engine
            .eval(
                r#"
                lark::plugins::register("a");
                throw "broken config";
            "#,
            )
            .unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(ref m) if m.contains("broken config")));
        assert!(engine.take_pending().is_empty());
    }

    #[test]
    fn test_parse_error() {
        let mut engine = engine();
        assert!(matches!(engine.eval("let = ;"), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn test_bad_subscribe_options() {
        let mut engine = engine();
        let err = engine
            .eval(r#"lark::events::on("x", || (), #{ priority: "high" });"#)
            .unwrap_err();
        assert!(err.to_string().contains("'priority' must be an integer"));
    }
}
