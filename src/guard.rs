//! Failure boundary around user callbacks
//!
//! Plugin config callbacks and event handlers run through [`guarded`]. An
//! `Err` return or a panic is turned into a message; neither escapes to the
//! caller of `load` or `emit`. The process panic hook still runs first, so
//! by default a contained panic is also printed to stderr; see
//! [`crate::log::route_panics`] to send it through the sink instead.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, converting an error or a panic into a message
pub(crate) fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(guarded(|| Ok(7)), Ok(7));
    }

    #[test]
    fn test_error_is_captured_with_context() {
        let result: Result<(), String> = guarded(|| {
            Err(anyhow::anyhow!("inner")).map_err(|e| e.context("outer"))
        });
        assert_eq!(result, Err("outer: inner".to_string()));
    }

    #[test]
    fn test_panic_is_captured() {
        let result: Result<(), String> = guarded(|| panic!("boom"));
        assert_eq!(result, Err("panicked: boom".to_string()));
    }
}
