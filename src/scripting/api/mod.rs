//! API modules for the `lark` namespace
//!
//! Each submodule provides functions under `lark::<module>::*`. Calls that
//! touch the core are queued as [`Declaration`]s and applied once the script
//! has finished.

pub mod config;
pub mod events;
pub mod plugins;
pub mod schema;

use std::sync::{Arc, PoisonError, RwLock};

use rhai::{Dynamic, FnPtr};

/// A core call made by a script, waiting to be applied
#[derive(Debug, Clone)]
pub enum Declaration {
    Plugin {
        name: String,
        spec: Dynamic,
    },
    Subscribe {
        event: String,
        handler: FnPtr,
        once: bool,
        priority: i64,
    },
    Schema {
        name: String,
        fields: Dynamic,
    },
}

/// Queue shared between the API modules and the script engine
pub type Declarations = Arc<RwLock<Vec<Declaration>>>;

pub(crate) fn push(queue: &Declarations, declaration: Declaration) {
    queue
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(declaration);
}
