use thiserror::Error;

/// Errors from the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Event names must be non-empty.
    #[error("event name must not be empty")]
    EmptyEventName,

    /// A handler value was not callable.
    #[error("handler for event '{event}' must be a function, got {found}")]
    NotCallable {
        /// Event the handler was meant for.
        event: String,
        /// Type name of the value received.
        found: String,
    },
}
