//! lark::events - Event subscriptions
//!
//! Usage in Rhai:
//! ```rhai
//! lark::events::on("plugin:configured", |name| print(`configured ${name}`));
//! lark::events::on("plugin:error", |err| print(err.error), #{ priority: 10, once: true });
//! ```

use rhai::plugin::*;
use rhai::FnPtr;

use super::{Declaration, Declarations, push};

/// Create the events module; subscriptions are queued on `queue`
pub fn create_module(queue: Declarations) -> rhai::Module {
    let mut module = rhai::Module::new();

    // on(event: &str, handler: FnPtr)
    {
        let q = queue.clone();
        module.set_native_fn("on", move |event: &str, handler: FnPtr| {
            push(
                &q,
                Declaration::Subscribe {
                    event: event.to_string(),
                    handler,
                    once: false,
                    priority: 0,
                },
            );
            Ok(())
        });
    }

    // on(event: &str, handler: FnPtr, opts: Map)
    {
        let q = queue.clone();
        module.set_native_fn(
            "on",
            move |event: &str, handler: FnPtr, opts: rhai::Map| -> Result<(), Box<EvalAltResult>> {
                let once = match opts.get("once") {
                    None => false,
                    Some(v) => v
                        .as_bool()
                        .map_err(|_| format!("'once' must be a boolean, got {}", v.type_name()))?,
                };
                let priority = match opts.get("priority") {
                    None => 0,
                    Some(v) => v
                        .as_int()
                        .map_err(|_| format!("'priority' must be an integer, got {}", v.type_name()))?,
                };
                push(
                    &q,
                    Declaration::Subscribe {
                        event: event.to_string(),
                        handler,
                        once,
                        priority,
                    },
                );
                Ok(())
            },
        );
    }

    module
}
