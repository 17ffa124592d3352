//! Plugin registry: registration, dependency resolution, and loading
//!
//! A plugin is either registered or loaded. Loading is idempotent and a
//! failed load leaves the plugin registered, so it can be retried. Once
//! loaded, a plugin stays loaded for the life of the process.
//!
//! Before anything loads, the whole dependency chain is resolved: a missing
//! dependency or a cycle fails the call with nothing marked loaded.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{BEFORE_LOAD, CONFIGURED, ERROR, LOADED, Plugin, PluginError, PluginSpec};
use crate::events::EventBus;
use crate::guard::guarded;
use crate::log::{LogSink, Severity};
use crate::value::Value;

/// Filter for [`PluginRegistry::list`]; `None` matches either way
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginFilter {
    pub loaded: Option<bool>,
    pub lazy: Option<bool>,
}

impl PluginFilter {
    pub fn loaded(mut self, loaded: bool) -> Self {
        self.loaded = Some(loaded);
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    fn matches(&self, plugin: &Plugin) -> bool {
        self.loaded.is_none_or(|l| l == plugin.loaded) && self.lazy.is_none_or(|l| l == plugin.spec.lazy)
    }
}

/// Outcome of [`PluginRegistry::load_all`]
#[derive(Debug, Default)]
pub struct LoadAllReport {
    /// Plugins that loaded during this call, dependencies included
    pub loaded: Vec<String>,
    pub failed: Vec<(String, PluginError)>,
}

/// Plugin registry handle; clones share the same plugins
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Arc<RwLock<BTreeMap<String, Plugin>>>,
    /// Plugins whose config callback is running
    loading: Arc<Mutex<HashSet<String>>>,
    events: EventBus,
    sink: LogSink,
}

impl PluginRegistry {
    /// Create a registry that reports lifecycle events on `events`
    pub fn new(events: EventBus, sink: LogSink) -> Self {
        Self {
            plugins: Arc::default(),
            loading: Arc::default(),
            events,
            sink,
        }
    }

    /// Register a plugin. Dependencies need only exist by the time it loads.
    pub fn register(&self, name: &str, spec: PluginSpec) -> Result<(), PluginError> {
        if name.is_empty() {
            return Err(PluginError::EmptyName);
        }

        let mut plugins = self.write();
        if plugins.contains_key(name) {
            return Err(PluginError::AlreadyRegistered(name.to_string()));
        }
        plugins.insert(
            name.to_string(),
            Plugin {
                name: name.to_string(),
                spec,
                loaded: false,
            },
        );

        tracing::debug!(plugin = name, "registered plugin");
        Ok(())
    }

    /// Register a plugin from a spec table
    pub fn register_value(&self, name: &str, spec: &Value) -> Result<(), PluginError> {
        if name.is_empty() {
            return Err(PluginError::EmptyName);
        }
        let spec = PluginSpec::from_value(name, spec)?;
        self.register(name, spec)
    }

    /// Load a plugin and, first, everything it depends on
    ///
    /// For each plugin in the chain: emits `plugin:before_load` and
    /// `plugin:loaded`, runs the config callback, then emits
    /// `plugin:configured` on success or `plugin:error` on failure. A plugin
    /// is marked loaded only after its callback succeeds (or it has none).
    pub fn load(&self, name: &str) -> Result<(), PluginError> {
        if self.is_loaded(name) {
            return Ok(());
        }
        if self.loading().contains(name) {
            return Err(PluginError::AlreadyLoading(name.to_string()));
        }

        let order = self.resolve_order(name)?;
        for plugin in &order {
            self.load_one(plugin)?;
        }
        Ok(())
    }

    /// Plugins that a `load(name)` would load, dependencies first
    ///
    /// Already-loaded plugins are skipped. Fails on an unknown plugin, a
    /// missing dependency, a cycle, or a dependency that is mid-load.
    pub fn resolve_order(&self, name: &str) -> Result<Vec<String>, PluginError> {
        let loading = self.loading().clone();
        let plugins = self.read();
        if !plugins.contains_key(name) {
            return Err(PluginError::NotFound(name.to_string()));
        }

        let mut walk = Walk {
            plugins: &plugins,
            loading: &loading,
            visited: HashSet::new(),
            stack: Vec::new(),
            order: Vec::new(),
        };
        walk.visit(name)?;
        Ok(walk.order)
    }

    fn load_one(&self, name: &str) -> Result<(), PluginError> {
        let spec = match self.read().get(name) {
            Some(plugin) if plugin.loaded => return Ok(()),
            Some(plugin) => plugin.spec.clone(),
            None => return Err(PluginError::NotFound(name.to_string())),
        };

        if !self.loading().insert(name.to_string()) {
            return Err(PluginError::AlreadyLoading(name.to_string()));
        }
        let result = self.configure(name, &spec);
        self.loading().remove(name);
        result
    }

    fn configure(&self, name: &str, spec: &PluginSpec) -> Result<(), PluginError> {
        let payload = Value::from(name);
        self.events.emit(BEFORE_LOAD, &payload);
        self.events.emit(LOADED, &payload);

        if let Some(config) = &spec.config {
            if let Err(message) = guarded(|| config.call(&[])) {
                self.events.emit(
                    ERROR,
                    &Value::record([("name", name), ("error", message.as_str())]),
                );
                (self.sink)(
                    &format!("Failed to configure plugin '{name}': {message}"),
                    Severity::Error,
                );
                return Err(PluginError::ConfigFailed {
                    plugin: name.to_string(),
                    message,
                });
            }
            self.events.emit(CONFIGURED, &payload);
        }

        if let Some(plugin) = self.write().get_mut(name) {
            plugin.loaded = true;
        }
        tracing::debug!(plugin = name, "loaded plugin");
        Ok(())
    }

    /// Load every registered plugin that is not lazy, in name order
    ///
    /// Failures are reported and collected; they do not stop the remaining
    /// plugins from loading.
    pub fn load_all(&self) -> LoadAllReport {
        let eager: Vec<String> = self
            .read()
            .values()
            .filter(|p| !p.spec.lazy && !p.loaded)
            .map(|p| p.name.clone())
            .collect();

        let mut report = LoadAllReport::default();
        for name in eager {
            if self.is_loaded(&name) {
                continue;
            }
            let before: HashSet<String> = self.loaded_names();
            let result = self.load(&name);
            report
                .loaded
                .extend(self.loaded_names().into_iter().filter(|n| !before.contains(n)));
            if let Err(err) = result {
                (self.sink)(&format!("Failed to load plugin '{name}': {err}"), Severity::Warn);
                report.failed.push((name, err));
            }
        }
        report.loaded.sort();
        report
    }

    /// Remove a plugin that has not been loaded
    pub fn unregister(&self, name: &str) -> Result<(), PluginError> {
        let mut plugins = self.write();
        match plugins.get(name) {
            None => Err(PluginError::NotFound(name.to_string())),
            Some(plugin) if plugin.loaded => Err(PluginError::AlreadyLoaded(name.to_string())),
            Some(_) => {
                plugins.remove(name);
                Ok(())
            }
        }
    }

    /// Copy of a registered plugin
    pub fn get(&self, name: &str) -> Option<Plugin> {
        self.read().get(name).cloned()
    }

    /// Copies of every plugin matching `filter`, in name order
    pub fn list(&self, filter: PluginFilter) -> Vec<Plugin> {
        self.read().values().filter(|p| filter.matches(p)).cloned().collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.read().get(name).is_some_and(|p| p.loaded)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn loaded_names(&self) -> HashSet<String> {
        self.read()
            .values()
            .filter(|p| p.loaded)
            .map(|p| p.name.clone())
            .collect()
    }

    fn loading(&self) -> MutexGuard<'_, HashSet<String>> {
        self.loading.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Plugin>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Plugin>> {
        self.plugins.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.len()).finish()
    }
}

/// Depth-first walk over the dependency graph
///
/// `visited` holds fully processed plugins, `stack` the current path. Meeting
/// a plugin that is already on the stack means a cycle; meeting one in
/// `loading` means a config callback is loading its own dependent.
struct Walk<'a> {
    plugins: &'a BTreeMap<String, Plugin>,
    loading: &'a HashSet<String>,
    visited: HashSet<String>,
    stack: Vec<String>,
    order: Vec<String>,
}

impl Walk<'_> {
    fn visit(&mut self, name: &str) -> Result<(), PluginError> {
        if self.visited.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.stack.iter().position(|n| n == name) {
            let mut path = self.stack[start..].to_vec();
            path.push(name.to_string());
            return Err(PluginError::Cycle { path });
        }

        let plugin = match self.plugins.get(name) {
            Some(plugin) => plugin,
            None => {
                return Err(match self.stack.last() {
                    Some(parent) => PluginError::MissingDependency {
                        plugin: parent.clone(),
                        dependency: name.to_string(),
                    },
                    None => PluginError::NotFound(name.to_string()),
                });
            }
        };

        // Loaded plugins had their whole chain loaded already
        if plugin.loaded {
            self.visited.insert(name.to_string());
            return Ok(());
        }
        if self.loading.contains(name) {
            return Err(PluginError::AlreadyLoading(name.to_string()));
        }

        self.stack.push(name.to_string());
        for dep in &plugin.spec.dependencies {
            self.visit(dep)?;
        }
        self.stack.pop();

        self.visited.insert(name.to_string());
        self.order.push(name.to_string());
        Ok(())
    }
}
