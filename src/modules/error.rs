use thiserror::Error;

/// Errors from the module loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("module name must not be empty")]
    EmptyName,

    /// The resolver could not produce the module.
    #[error("failed to load module '{name}': {message}")]
    Resolve {
        /// Logical module name.
        name: String,
        /// Underlying cause.
        message: String,
    },

    /// The module's `setup` failed or returned false.
    #[error("setup of module '{name}' failed: {message}")]
    Setup {
        /// Logical module name.
        name: String,
        /// Captured error, or why the call counts as a failure.
        message: String,
    },

    #[error("invalid module pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as given.
        pattern: String,
        /// Regex compiler message.
        message: String,
    },
}
