//! Event bus for lifecycle and editor events

mod bus;
mod error;

pub use bus::{EmitReport, EventBus, OffTarget, SubscribeOptions, Subscription, SubscriptionId};
pub use error::EventError;
