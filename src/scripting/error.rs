use std::path::PathBuf;

use thiserror::Error;

/// Errors from running scripts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("script error: {0}")]
    Runtime(String),

    /// The script ran, but some of what it declared was rejected.
    #[error("{} declaration(s) failed:\n{}", .0.len(), .0.join("\n"))]
    Declarations(Vec<String>),
}
