//! Module loading over an explicit, per-loader cache

mod error;
mod loader;
mod resolver;

pub use error::ModuleError;
pub use loader::{LoadOptions, ModuleLoader};
pub use resolver::{LoadedModule, ModuleCache, ModuleResolver, StaticResolver};
