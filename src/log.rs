//! Diagnostics sink
//!
//! The core never prints. Everything meant for the user (handler failures,
//! plugin config errors, module load errors) goes through one injected
//! [`LogSink`]. The default sink forwards to `tracing`.

use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

use crate::guard::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives `(message, severity)` pairs
pub type LogSink = Arc<dyn Fn(&str, Severity) + Send + Sync>;

/// Sink that forwards to the `tracing` macros at the matching level
pub fn tracing_sink() -> LogSink {
    Arc::new(|message: &str, severity: Severity| match severity {
        Severity::Trace => tracing::trace!(target: "lark", "{message}"),
        Severity::Debug => tracing::debug!(target: "lark", "{message}"),
        Severity::Info => tracing::info!(target: "lark", "{message}"),
        Severity::Warn => tracing::warn!(target: "lark", "{message}"),
        Severity::Error => tracing::error!(target: "lark", "{message}"),
    })
}

/// Sink that drops everything
pub fn null_sink() -> LogSink {
    Arc::new(|_: &str, _: Severity| {})
}

/// Replace the process panic hook with one that reports through `sink`
///
/// Panics in config callbacks and event handlers are contained and reported
/// to the sink already, but the default hook still prints them to stderr
/// first. Hosts that want a single diagnostics channel opt in here. The
/// hook is process-wide.
pub fn route_panics(sink: LogSink) {
    panic::set_hook(Box::new(move |info| sink(&panic_report(info), Severity::Error)));
}

fn panic_report(info: &PanicHookInfo<'_>) -> String {
    let message = panic_message(info.payload());
    match info.location() {
        Some(location) => format!("{message} at {location}"),
        None => message,
    }
}
