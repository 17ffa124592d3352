//! lark::schema - Configuration schemas
//!
//! Usage in Rhai:
//! ```rhai
//! lark::schema::define("server", #{
//!     port: #{ type: "number", required: true, validator: |p| p > 0 && p < 65536 },
//!     hosts: #{ type: "array", items: #{ type: "string" }, "default": ["localhost"] },
//! });
//! ```
//!
//! `default` is a reserved word in Rhai, so that key has to be quoted.

use rhai::plugin::*;
use rhai::Dynamic;

use super::{Declaration, Declarations, push};

/// Create the schema module; definitions are queued on `queue`
pub fn create_module(queue: Declarations) -> rhai::Module {
    let mut module = rhai::Module::new();

    // define(name: &str, fields: Map)
    module.set_native_fn("define", move |name: &str, fields: rhai::Map| {
        push(
            &queue,
            Declaration::Schema {
                name: name.to_string(),
                fields: Dynamic::from(fields),
            },
        );
        Ok(())
    });

    module
}
