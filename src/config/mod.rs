//! Core settings and default locations
//!
//! Everything lives under `~/.config/lark/` on all platforms:
//! - `init.rhai` - the init script
//! - `modules/` - script modules resolved by name

mod settings;

use std::path::PathBuf;

pub use settings::Settings;

/// The config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config").join("lark"))
}

/// The default init script path
pub fn init_file() -> Option<PathBuf> {
    config_dir().map(|p| p.join("init.rhai"))
}

/// The default script module directory
pub fn modules_dir() -> Option<PathBuf> {
    config_dir().map(|p| p.join("modules"))
}
