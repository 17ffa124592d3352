//! lark::plugins - Plugin registration
//!
//! Usage in Rhai:
//! ```rhai
//! lark::plugins::register("telescope", #{
//!     dependencies: ["plenary"],
//!     cmd: "Telescope",
//!     lazy: true,
//!     config: || print("telescope ready"),
//! });
//! ```

use rhai::plugin::*;
use rhai::Dynamic;

use super::{Declaration, Declarations, push};

/// Create the plugins module; registrations are queued on `queue`
pub fn create_module(queue: Declarations) -> rhai::Module {
    let mut module = rhai::Module::new();

    // register(name: &str, spec: Map)
    {
        let q = queue.clone();
        module.set_native_fn("register", move |name: &str, spec: rhai::Map| {
            push(
                &q,
                Declaration::Plugin {
                    name: name.to_string(),
                    spec: Dynamic::from(spec),
                },
            );
            Ok(())
        });
    }

    // register(name: &str)
    {
        let q = queue.clone();
        module.set_native_fn("register", move |name: &str| {
            push(
                &q,
                Declaration::Plugin {
                    name: name.to_string(),
                    spec: Dynamic::UNIT,
                },
            );
            Ok(())
        });
    }

    module
}
