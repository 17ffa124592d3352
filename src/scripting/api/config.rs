//! lark::config - Core settings
//!
//! Usage in Rhai:
//! ```rhai
//! lark::config::add_module_path("~/src/lark-modules");
//! lark::config::set_auto_load(false);
//! lark::config::set_call_setup(true);
//! ```

use rhai::plugin::*;
use std::sync::{Arc, RwLock};

use crate::config::Settings;

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> std::path::PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.into()),
        None => path.into(),
    }
}

/// Create the config module with access to settings
pub fn create_module(settings: Arc<RwLock<Settings>>) -> rhai::Module {
    let mut module = rhai::Module::new();

    // add_module_path(path: &str)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("add_module_path", move |path: &str| {
            if let Ok(mut settings) = s.write() {
                settings.add_module_path(expand_home(path));
            }
            Ok(())
        });
    }

    // module_paths() -> Array
    {
        let s = Arc::clone(&settings);
        module.set_native_fn(
            "module_paths",
            move || -> Result<rhai::Array, Box<EvalAltResult>> {
                Ok(s.read()
                    .map(|s| {
                        s.module_paths
                            .iter()
                            .map(|p| rhai::Dynamic::from(p.display().to_string()))
                            .collect()
                    })
                    .unwrap_or_default())
            },
        );
    }

    // set_auto_load(enabled: bool)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_auto_load", move |enabled: bool| {
            if let Ok(mut settings) = s.write() {
                settings.auto_load = enabled;
            }
            Ok(())
        });
    }

    // get_auto_load() -> bool
    {
        let s = Arc::clone(&settings);
        module.set_native_fn(
            "get_auto_load",
            move || -> Result<bool, Box<EvalAltResult>> {
                Ok(s.read().map(|s| s.auto_load).unwrap_or(true))
            },
        );
    }

    // set_call_setup(enabled: bool)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_call_setup", move |enabled: bool| {
            if let Ok(mut settings) = s.write() {
                settings.call_setup = enabled;
            }
            Ok(())
        });
    }

    module
}
