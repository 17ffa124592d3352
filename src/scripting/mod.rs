//! Scripting module - Rhai runtime for configuration and plugins
//!
//! All core functions are exposed under the `lark` namespace:
//! - `lark::config::*` - module paths, bootstrap switches
//! - `lark::plugins::*` - plugin registration
//! - `lark::events::*` - event subscriptions
//! - `lark::schema::*` - configuration schemas
//!
//! Script modules found on the module path are resolved by [`ScriptResolver`].

pub mod api;
mod convert;
mod engine;
mod error;
mod resolver;

pub(crate) use convert::Pending;
pub use engine::ScriptEngine;
pub use error::ScriptError;
pub use resolver::ScriptResolver;
