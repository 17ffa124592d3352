use thiserror::Error;

/// Errors from the plugin registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("plugin name must not be empty")]
    EmptyName,

    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),

    #[error("plugin not found: {0}")]
    NotFound(String),

    /// Loaded plugins stay for the life of the process.
    #[error("plugin '{0}' is loaded and cannot be unregistered")]
    AlreadyLoaded(String),

    /// The spec table had the wrong shape.
    #[error("invalid spec for plugin '{plugin}': {reason}")]
    InvalidSpec {
        /// Plugin being registered.
        plugin: String,
        /// What was wrong.
        reason: String,
    },

    /// A listed dependency is not registered.
    #[error("plugin '{plugin}' depends on '{dependency}', which is not registered")]
    MissingDependency {
        /// Plugin declaring the dependency.
        plugin: String,
        /// Name that could not be found.
        dependency: String,
    },

    /// The dependency graph loops back on itself.
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle {
        /// Plugins along the cycle, first and last equal.
        path: Vec<String>,
    },

    /// A config callback asked for a plugin whose load is still in progress.
    #[error("plugin '{0}' is still loading")]
    AlreadyLoading(String),

    /// The plugin's config callback failed.
    #[error("failed to configure plugin '{plugin}': {message}")]
    ConfigFailed {
        /// Plugin whose callback failed.
        plugin: String,
        /// Captured error or panic message.
        message: String,
    },
}
