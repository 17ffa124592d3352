//! Plugin registry with dependency resolution and lifecycle events
//!
//! Lifecycle events carry the plugin name as payload, except `plugin:error`
//! which carries `{name, error}`.

mod error;
mod registry;
mod spec;

pub use error::PluginError;
pub use registry::{LoadAllReport, PluginFilter, PluginRegistry};
pub use spec::{Plugin, PluginSpec};

/// Dependencies are satisfied and the plugin is about to load
pub const BEFORE_LOAD: &str = "plugin:before_load";
pub const LOADED: &str = "plugin:loaded";
/// The config callback completed
pub const CONFIGURED: &str = "plugin:configured";
/// The config callback failed
pub const ERROR: &str = "plugin:error";
