//! Lark core: plugins, events, schemas, and modules for a scriptable editor
//!
//! The [`Runtime`] owns one of each registry and a Rhai engine for the init
//! script. Every subsystem can also be used on its own.

pub mod config;
pub mod events;
mod guard;
pub mod log;
pub mod modules;
pub mod plugins;
mod runtime;
pub mod schema;
pub mod scripting;
pub mod value;

pub use runtime::{Runtime, RuntimeError};
pub use value::{Callable, Table, Value};
