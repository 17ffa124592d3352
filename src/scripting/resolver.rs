//! Resolve module names to Rhai files on the module search path
//!
//! `a.b` is looked up as `<path>/a/b.rhai`, then `<path>/a/b/init.rhai`,
//! for each configured path in order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use rhai::{FnPtr, Scope};

use super::engine::Runner;
use crate::config::Settings;
use crate::modules::{LoadedModule, ModuleResolver};
use crate::value::{Table, Value};

pub struct ScriptResolver {
    runner: Runner,
    settings: Arc<RwLock<Settings>>,
}

impl ScriptResolver {
    pub(crate) fn new(runner: Runner, settings: Arc<RwLock<Settings>>) -> Self {
        Self { runner, settings }
    }

    /// Candidate files for `name`, in search order
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let relative: PathBuf = name.split('.').collect();
        let paths = self
            .settings
            .read()
            .map(|s| s.module_paths.clone())
            .unwrap_or_default();

        paths
            .iter()
            .flat_map(|dir| {
                [
                    dir.join(&relative).with_extension("rhai"),
                    dir.join(&relative).join("init.rhai"),
                ]
            })
            .collect()
    }

    fn run_file(&self, name: &str, path: &Path) -> anyhow::Result<LoadedModule> {
        let ast = self
            .runner
            .engine
            .compile_file(path.to_path_buf())
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to compile {}", path.display()))?;

        let has_setup = ast
            .iter_functions()
            .any(|f| f.name == "setup" && f.params.is_empty());
        let context = self.runner.context(ast);

        let mut scope = Scope::new();
        let returned = self
            .runner
            .run(&context, &mut scope)
            .with_context(|| format!("failed to run {}", path.display()))?;

        // A returned value wins; otherwise the module's top-level variables
        let exports = if returned.is_unit() {
            let table: Table = scope
                .iter()
                .map(|(var, _, value)| (var.to_string(), context.to_value(value)))
                .collect();
            Value::Table(table)
        } else {
            context.to_value(returned)
        };

        let mut module = LoadedModule::new(name).with_exports(exports);
        if has_setup {
            let setup = FnPtr::new("setup").map_err(|e| anyhow::anyhow!("{e}"))?;
            module.setup = Some(context.callable(setup));
        }
        tracing::debug!(module = name, path = %path.display(), "loaded script module");
        Ok(module)
    }
}

impl ModuleResolver for ScriptResolver {
    fn resolve(&self, name: &str) -> anyhow::Result<LoadedModule> {
        let candidates = self.candidates(name);
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => self.run_file(name, path),
            None => {
                let tried: Vec<String> = candidates
                    .iter()
                    .map(|p| format!("\n\tno file '{}'", p.display()))
                    .collect();
                anyhow::bail!("module '{name}' not found:{}", tried.concat())
            }
        }
    }
}
