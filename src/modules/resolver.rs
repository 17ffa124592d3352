//! Host adapters that turn a logical module name into a module

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::value::{Callable, Value};

/// A resolved module
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub name: String,
    /// Values the module makes available
    pub exports: Value,
    /// Zero-argument entry point; a falsy return means failure
    pub setup: Option<Callable>,
}

impl LoadedModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: Value::Nil,
            setup: None,
        }
    }

    pub fn with_exports(mut self, exports: impl Into<Value>) -> Self {
        self.exports = exports.into();
        self
    }

    pub fn with_setup<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.setup = Some(Callable::new(move |_| f().map(Value::Bool)));
        self
    }
}

/// Resolves module names for a [`ModuleLoader`](super::ModuleLoader)
pub trait ModuleResolver {
    fn resolve(&self, name: &str) -> anyhow::Result<LoadedModule>;
}

type Factory = Arc<dyn Fn() -> anyhow::Result<LoadedModule> + Send + Sync>;

/// In-memory resolver backed by registered factories
#[derive(Clone, Default)]
pub struct StaticResolver {
    factories: HashMap<String, Factory>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; it runs each time the module is resolved
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<LoadedModule> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn with<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<LoadedModule> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }
}

impl ModuleResolver for StaticResolver {
    fn resolve(&self, name: &str) -> anyhow::Result<LoadedModule> {
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => anyhow::bail!("module '{name}' not found"),
        }
    }
}

/// The loader's module cache
///
/// Holds every module resolved so far, whichever caller triggered it.
#[derive(Debug, Clone, Default)]
pub struct ModuleCache {
    modules: BTreeMap<String, LoadedModule>,
}

impl ModuleCache {
    pub fn get(&self, name: &str) -> Option<&LoadedModule> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn insert(&mut self, module: LoadedModule) {
        self.modules.insert(module.name.clone(), module);
    }

    /// Drop a module so the next load resolves it again
    pub fn evict(&mut self, name: &str) -> Option<LoadedModule> {
        self.modules.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new().with("lark.ui", || {
            Ok(LoadedModule::new("lark.ui").with_exports(Value::record([("version", 2)])))
        });
        let module = resolver.resolve("lark.ui").unwrap();
        assert_eq!(module.exports.get("version"), &Value::from(2));

        let err = resolver.resolve("lark.missing").unwrap_err();
        assert_eq!(err.to_string(), "module 'lark.missing' not found");
    }

    #[test]
    fn test_cache_evict() {
        let mut cache = ModuleCache::default();
        cache.insert(LoadedModule::new("a"));
        cache.insert(LoadedModule::new("b"));
        assert_eq!(cache.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(cache.evict("a").is_some());
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 1);
    }
}
