//! Conversions between Rhai values and core values
//!
//! Function pointers become [`Callable`]s bound to the engine and the AST
//! that defined them, so they can be called after the script has finished.

use std::sync::{Arc, Mutex, PoisonError};

use rhai::{AST, Dynamic, Engine, FnPtr};

use super::api::{Declaration, Declarations};
use crate::value::{Callable, Table, Value};

/// A declaration together with the script it came from
pub(crate) struct Pending {
    pub(crate) context: ScriptContext,
    pub(crate) declaration: Declaration,
}

/// Declarations from finished scripts, waiting to be applied
pub(crate) type PendingQueue = Arc<Mutex<Vec<Pending>>>;

/// Engine and AST a function pointer belongs to
#[derive(Clone)]
pub(crate) struct ScriptContext {
    pub(crate) engine: Arc<Engine>,
    pub(crate) ast: Arc<AST>,
    declarations: Declarations,
    pending: PendingQueue,
}

impl ScriptContext {
    /// A context with its own, unshared queues
    #[cfg(test)]
    pub(crate) fn new(engine: Arc<Engine>, ast: Arc<AST>) -> Self {
        Self::with_queues(engine, ast, Declarations::default(), PendingQueue::default())
    }

    pub(crate) fn with_queues(
        engine: Arc<Engine>,
        ast: Arc<AST>,
        declarations: Declarations,
        pending: PendingQueue,
    ) -> Self {
        Self {
            engine,
            ast,
            declarations,
            pending,
        }
    }

    /// Move raw declarations into the pending queue, tagged with this context
    ///
    /// When `keep` is false they are dropped instead.
    pub(crate) fn collect(&self, keep: bool) {
        let declarations: Vec<Declaration> = self
            .declarations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if !keep || declarations.is_empty() {
            return;
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(declarations.into_iter().map(|declaration| Pending {
                context: self.clone(),
                declaration,
            }));
    }

    /// Wrap a script function so it can be called as a [`Callable`]
    ///
    /// Declarations made while it runs are queued like a script's.
    pub(crate) fn callable(&self, fn_ptr: FnPtr) -> Callable {
        let ctx = self.clone();
        Callable::new(move |args| {
            let args: Vec<Dynamic> = args.iter().map(to_dynamic).collect();
            let result = fn_ptr.call::<Dynamic>(&ctx.engine, &ctx.ast, args);
            ctx.collect(result.is_ok());
            let result = result.map_err(|err| anyhow::anyhow!("{}: {err}", fn_ptr.fn_name()))?;
            Ok(ctx.to_value(result))
        })
    }

    pub(crate) fn to_value(&self, value: Dynamic) -> Value {
        let value = value.flatten();
        if value.is_unit() {
            return Value::Nil;
        }
        if let Ok(b) = value.as_bool() {
            return Value::Bool(b);
        }
        if let Ok(i) = value.as_int() {
            return Value::Number(i as f64);
        }
        if let Ok(f) = value.as_float() {
            return Value::Number(f);
        }
        if let Ok(c) = value.as_char() {
            return Value::String(c.to_string());
        }
        if value.is::<rhai::ImmutableString>() {
            return value.into_string().map(Value::String).unwrap_or_default();
        }
        if value.is::<FnPtr>() {
            return value
                .try_cast::<FnPtr>()
                .map(|f| Value::Function(self.callable(f)))
                .unwrap_or_default();
        }
        if value.is::<rhai::Array>() {
            let items = value.try_cast::<rhai::Array>().unwrap_or_default();
            return Value::array(items.into_iter().map(|item| self.to_value(item)));
        }
        if value.is::<rhai::Map>() {
            let map = value.try_cast::<rhai::Map>().unwrap_or_default();
            return Value::Table(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), self.to_value(v)))
                    .collect::<Table>(),
            );
        }
        Value::String(value.to_string())
    }
}

/// Convert a core value for use inside a script
///
/// Functions have no script representation and become `()`.
pub(crate) fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Nil | Value::Function(_) => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Dynamic::from(*n as rhai::INT)
            } else {
                Dynamic::from(*n as rhai::FLOAT)
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Table(t) if t.is_array() && !t.is_empty() => {
            Dynamic::from(t.values().map(to_dynamic).collect::<rhai::Array>())
        }
        Value::Table(t) => {
            let map: rhai::Map = t
                .iter()
                .map(|(k, v)| (k.to_string().into(), to_dynamic(v)))
                .collect();
            Dynamic::from(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(script: &str) -> ScriptContext {
        let engine = Engine::new();
        let ast = engine.compile(script).unwrap();
        ScriptContext::new(Arc::new(engine), Arc::new(ast))
    }

    #[test]
    fn test_round_trip_data() {
        let ctx = context("");
        let value = Value::from(json!({"name": "lark", "tabs": [2, 4], "ratio": 0.5, "on": true}));
        assert_eq!(ctx.to_value(to_dynamic(&value)), value);
    }

    #[test]
    fn test_function_pointer_becomes_callable() {
        let ctx = context("fn double(x) { x * 2 }");
        let f = ctx.to_value(Dynamic::from(FnPtr::new("double").unwrap()));
        let result = f.as_function().unwrap().call(&[Value::from(21)]).unwrap();
        assert_eq!(result, Value::from(42));
    }

    #[test]
    fn test_script_error_surfaces_as_error() {
        let ctx = context(r#"fn fail() { throw "nope"; }"#);
        let f = ctx.callable(FnPtr::new("fail").unwrap());
        let err = f.call(&[]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
