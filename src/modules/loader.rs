//! Caching module loader
//!
//! Resolution is delegated to a [`ModuleResolver`]; the loader adds the cache,
//! forced reloads, and a record of what it loaded itself.

use std::fmt;

use regex::Regex;

use super::{LoadedModule, ModuleCache, ModuleError, ModuleResolver};
use crate::guard::guarded;
use crate::log::{LogSink, Severity};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Evict from the cache before resolving
    pub force: bool,
    /// Do not report failures to the sink
    pub silent: bool,
    /// Call the module's `setup` after resolving
    pub call_setup: bool,
}

impl LoadOptions {
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn call_setup(mut self) -> Self {
        self.call_setup = true;
        self
    }
}

pub struct ModuleLoader {
    resolver: Box<dyn ModuleResolver>,
    cache: ModuleCache,
    /// Names loaded through this loader, first load first
    tracked: Vec<String>,
    sink: LogSink,
}

impl ModuleLoader {
    pub fn new(resolver: impl ModuleResolver + 'static, sink: LogSink) -> Self {
        Self {
            resolver: Box::new(resolver),
            cache: ModuleCache::default(),
            tracked: Vec::new(),
            sink,
        }
    }

    /// Resolve `name`, using the cache unless `force` is set
    pub fn load(&mut self, name: &str, opts: LoadOptions) -> Result<LoadedModule, ModuleError> {
        let result = self.load_inner(name, opts);
        if let Err(err) = &result {
            if !opts.silent {
                (self.sink)(&err.to_string(), Severity::Error);
            }
        }
        result
    }

    fn load_inner(&mut self, name: &str, opts: LoadOptions) -> Result<LoadedModule, ModuleError> {
        if name.is_empty() {
            return Err(ModuleError::EmptyName);
        }
        if opts.force {
            self.cache.evict(name);
        }

        let module = match self.cache.get(name) {
            Some(module) => module.clone(),
            None => {
                let mut module = self.resolver.resolve(name).map_err(|err| ModuleError::Resolve {
                    name: name.to_string(),
                    message: format!("{err:#}"),
                })?;
                module.name = name.to_string();
                self.cache.insert(module.clone());
                tracing::debug!(module = name, "resolved module");
                module
            }
        };

        if !self.tracked.iter().any(|n| n == name) {
            self.tracked.push(name.to_string());
        }

        if opts.call_setup {
            if let Some(setup) = &module.setup {
                match guarded(|| setup.call(&[])) {
                    Ok(ret) if ret.is_nil() || ret.is_truthy() => {}
                    Ok(ret) => {
                        return Err(ModuleError::Setup {
                            name: name.to_string(),
                            message: format!("setup returned {ret}"),
                        });
                    }
                    Err(message) => {
                        return Err(ModuleError::Setup {
                            name: name.to_string(),
                            message,
                        });
                    }
                }
            }
        }

        Ok(module)
    }

    /// Evict from the cache, then load
    pub fn reload(&mut self, name: &str, opts: LoadOptions) -> Result<LoadedModule, ModuleError> {
        self.cache.evict(name);
        self.load(name, opts)
    }

    /// Whether the cache holds `name`, however it got there
    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<LoadedModule> {
        self.cache.get(name).cloned()
    }

    /// Evict a module and forget that this loader loaded it
    pub fn unload(&mut self, name: &str) -> bool {
        self.tracked.retain(|n| n != name);
        self.cache.evict(name).is_some()
    }

    /// Names loaded through this loader, or with a pattern, every cached
    /// name matching it
    pub fn loaded_modules(&self, pattern: Option<&str>) -> Result<Vec<String>, ModuleError> {
        match pattern {
            None => Ok(self.tracked.clone()),
            Some(pattern) => {
                let re = Regex::new(pattern).map_err(|err| ModuleError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                })?;
                Ok(self
                    .cache
                    .names()
                    .filter(|name| re.is_match(name))
                    .map(str::to_string)
                    .collect())
            }
        }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Direct cache access, for modules that arrive by other routes
    pub fn cache_mut(&mut self) -> &mut ModuleCache {
        &mut self.cache
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("cache", &self.cache)
            .field("tracked", &self.tracked)
            .finish()
    }
}
