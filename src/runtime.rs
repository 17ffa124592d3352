//! The runtime ties the registries to the script engine
//!
//! One `Runtime` holds its own event bus, plugin registry, schema registry
//! and module loader. Nothing is global, so several can coexist.

use std::path::Path;

use thiserror::Error;

use crate::config::{self, Settings};
use crate::events::{EventBus, SubscribeOptions};
use crate::log::{LogSink, Severity};
use crate::modules::{LoadOptions, LoadedModule, ModuleError, ModuleLoader, ModuleResolver};
use crate::plugins::{LoadAllReport, PluginError, PluginRegistry};
use crate::schema::SchemaRegistry;
use crate::scripting::api::Declaration;
use crate::scripting::{Pending, ScriptEngine, ScriptError};

/// Errors from runtime operations that span subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub struct Runtime {
    sink: LogSink,
    script: ScriptEngine,
    events: EventBus,
    plugins: PluginRegistry,
    schemas: SchemaRegistry,
    modules: ModuleLoader,
}

impl Runtime {
    /// A runtime with default settings that resolves modules from script files
    pub fn new(sink: LogSink) -> Self {
        Self::with_settings(Settings::default(), sink)
    }

    pub fn with_settings(settings: Settings, sink: LogSink) -> Self {
        let script = ScriptEngine::with_settings(settings);
        let resolver = script.resolver();
        Self::assemble(script, resolver, sink)
    }

    /// A runtime whose modules come from a host resolver
    pub fn with_resolver(settings: Settings, resolver: impl ModuleResolver + 'static, sink: LogSink) -> Self {
        Self::assemble(ScriptEngine::with_settings(settings), resolver, sink)
    }

    fn assemble(script: ScriptEngine, resolver: impl ModuleResolver + 'static, sink: LogSink) -> Self {
        let events = EventBus::new(sink.clone());
        let plugins = PluginRegistry::new(events.clone(), sink.clone());
        Self {
            modules: ModuleLoader::new(resolver, sink.clone()),
            schemas: SchemaRegistry::new(),
            sink,
            script,
            events,
            plugins,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn modules(&self) -> &ModuleLoader {
        &self.modules
    }

    pub fn settings(&self) -> Settings {
        self.script.settings()
    }

    /// Evaluate a script, then apply what it declared
    pub fn run_script(&mut self, source: &str) -> Result<(), ScriptError> {
        self.script.eval(source)?;
        self.apply_pending()
    }

    pub fn run_file(&mut self, path: &Path) -> Result<(), ScriptError> {
        self.script.load_file(path)?;
        self.apply_pending()
    }

    /// Run an init script, then load every eager plugin if `auto_load` is set
    pub fn bootstrap(&mut self, source: &str) -> Result<Option<LoadAllReport>, ScriptError> {
        self.run_script(source)?;
        self.auto_load()
    }

    pub fn bootstrap_file(&mut self, path: &Path) -> Result<Option<LoadAllReport>, ScriptError> {
        self.run_file(path)?;
        self.auto_load()
    }

    /// Bootstrap from `~/.config/lark/init.rhai` when it exists
    pub fn bootstrap_default(&mut self) -> Result<Option<LoadAllReport>, ScriptError> {
        match config::init_file().filter(|path| path.is_file()) {
            Some(path) => self.bootstrap_file(&path),
            None => {
                tracing::info!("no init script found");
                self.auto_load()
            }
        }
    }

    fn auto_load(&mut self) -> Result<Option<LoadAllReport>, ScriptError> {
        if !self.settings().auto_load {
            return Ok(None);
        }
        let report = self.plugins.load_all();
        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "plugins loaded"
        );
        self.apply_pending()?;
        Ok(Some(report))
    }

    /// Load a plugin and apply anything its config callback declared
    pub fn load_plugin(&mut self, name: &str) -> Result<(), RuntimeError> {
        let loaded = self.plugins.load(name);
        let applied = self.apply_pending();
        loaded?;
        applied?;
        Ok(())
    }

    /// Load a module, calling its `setup` when `call_setup` is set
    pub fn require(&mut self, name: &str) -> Result<LoadedModule, RuntimeError> {
        let mut opts = LoadOptions::default();
        if self.settings().call_setup {
            opts = opts.call_setup();
        }
        let loaded = self.modules.load(name, opts);
        let applied = self.apply_pending();
        let module = loaded?;
        applied?;
        Ok(module)
    }

    /// Apply queued script declarations in the order they were made
    ///
    /// Every declaration is attempted; failures are reported to the sink and
    /// returned together.
    fn apply_pending(&mut self) -> Result<(), ScriptError> {
        let mut failures = Vec::new();
        for pending in self.script.take_pending() {
            if let Err(message) = self.apply(pending) {
                (self.sink)(&message, Severity::Error);
                failures.push(message);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScriptError::Declarations(failures))
        }
    }

    fn apply(&mut self, pending: Pending) -> Result<(), String> {
        let Pending {
            context,
            declaration,
        } = pending;
        match declaration {
            Declaration::Plugin { name, spec } => self
                .plugins
                .register_value(&name, &context.to_value(spec))
                .map_err(|e| e.to_string()),
            Declaration::Subscribe {
                event,
                handler,
                once,
                priority,
            } => {
                let priority = priority.clamp(i32::MIN.into(), i32::MAX.into()) as i32;
                let mut opts = SubscribeOptions::default().priority(priority);
                if once {
                    opts = opts.once();
                }
                self.events
                    .subscribe(&event, context.callable(handler), opts)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
            Declaration::Schema { name, fields } => self
                .schemas
                .define_value(&name, &context.to_value(fields))
                .map_err(|e| e.to_string()),
        }
    }
}
