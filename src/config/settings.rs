use std::path::PathBuf;

/// Core settings that can be customized from the init script
#[derive(Debug, Clone)]
pub struct Settings {
    // Module resolution
    pub module_paths: Vec<PathBuf>,

    // Bootstrap
    pub auto_load: bool,  // Load every non-lazy plugin after the init script
    pub call_setup: bool, // Call `setup` when a module is required
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            module_paths: super::modules_dir().into_iter().collect(),

            auto_load: true,
            call_setup: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with no search paths, for embedding and tests
    pub fn empty() -> Self {
        Self {
            module_paths: Vec::new(),
            ..Self::default()
        }
    }

    /// Append a search path, ignoring duplicates
    pub fn add_module_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.module_paths.contains(&path) {
            self.module_paths.push(path);
        }
    }
}
