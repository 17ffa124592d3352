//! Pub/sub event bus
//!
//! Handlers run in descending priority order; equal priorities keep
//! subscription order. Every handler runs inside a failure boundary, so one
//! failing handler never stops the rest.
//!
//! The bus is a cheap handle around shared state. `emit` works on a snapshot
//! and holds no lock while handlers run, so handlers may subscribe,
//! unsubscribe, or emit again.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::EventError;
use crate::guard::guarded;
use crate::log::{LogSink, Severity};
use crate::value::{Callable, Value};

/// Process-wide id counter so ids stay unique across bus instances
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier handed out by [`EventBus::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeOptions {
    /// Remove the subscription after its first dispatch
    pub once: bool,
    /// Higher runs first
    pub priority: i32,
}

impl SubscribeOptions {
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A registered handler
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub event: String,
    pub once: bool,
    pub priority: i32,
    callback: Callable,
}

impl Subscription {
    pub fn callback(&self) -> &Callable {
        &self.callback
    }
}

/// What to remove in [`EventBus::off`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffTarget {
    /// A single subscription, searched across every event
    Id(SubscriptionId),
    /// Every subscription of one event
    Event(String),
}

impl From<SubscriptionId> for OffTarget {
    fn from(id: SubscriptionId) -> Self {
        OffTarget::Id(id)
    }
}

impl From<&str> for OffTarget {
    fn from(event: &str) -> Self {
        OffTarget::Event(event.to_string())
    }
}

impl From<String> for OffTarget {
    fn from(event: String) -> Self {
        OffTarget::Event(event)
    }
}

/// Outcome of one [`EventBus::emit`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Handlers that completed
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

#[derive(Default)]
struct BusState {
    buckets: HashMap<String, Vec<Subscription>>,
}

/// Event bus handle; clones share the same subscriptions
#[derive(Clone)]
pub struct EventBus {
    state: Arc<RwLock<BusState>>,
    sink: LogSink,
}

impl EventBus {
    pub fn new(sink: LogSink) -> Self {
        Self {
            state: Arc::default(),
            sink,
        }
    }

    /// Subscribe a Rust closure to `event`
    pub fn on<F>(&self, event: &str, handler: F, opts: SubscribeOptions) -> Result<SubscriptionId, EventError>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback = Callable::new(move |args| {
            handler(args.first().unwrap_or(&Value::Nil))?;
            Ok(Value::Nil)
        });
        self.subscribe(event, callback, opts)
    }

    /// Subscribe a callable; it receives the payload as its only argument
    pub fn subscribe(&self, event: &str, callback: Callable, opts: SubscribeOptions) -> Result<SubscriptionId, EventError> {
        if event.is_empty() {
            return Err(EventError::EmptyEventName);
        }

        let id = SubscriptionId::next();
        let subscription = Subscription {
            id,
            event: event.to_string(),
            once: opts.once,
            priority: opts.priority,
            callback,
        };
        self.write().buckets.entry(event.to_string()).or_default().push(subscription);

        tracing::trace!(event, %id, priority = opts.priority, once = opts.once, "subscribed");
        Ok(id)
    }

    /// Subscribe a dynamic value, which must be a function
    pub fn subscribe_value(&self, event: &str, handler: &Value, opts: SubscribeOptions) -> Result<SubscriptionId, EventError> {
        let callback = handler.as_function().ok_or_else(|| EventError::NotCallable {
            event: event.to_string(),
            found: handler.type_name().to_string(),
        })?;
        self.subscribe(event, callback.clone(), opts)
    }

    /// Dispatch `payload` to every handler of `event`
    pub fn emit(&self, event: &str, payload: &Value) -> EmitReport {
        let mut snapshot = match self.read().buckets.get(event) {
            Some(subs) if !subs.is_empty() => subs.clone(),
            _ => return EmitReport::default(),
        };
        snapshot.sort_by_key(|s| Reverse(s.priority));

        let mut report = EmitReport::default();
        for sub in &snapshot {
            match guarded(|| sub.callback.call(std::slice::from_ref(payload))) {
                Ok(_) => report.delivered += 1,
                Err(message) => {
                    report.failed += 1;
                    (self.sink)(
                        &format!("Error in handler for event '{event}': {message}"),
                        Severity::Error,
                    );
                }
            }
        }

        let spent: Vec<SubscriptionId> = snapshot.iter().filter(|s| s.once).map(|s| s.id).collect();
        if !spent.is_empty() {
            let mut state = self.write();
            if let Some(subs) = state.buckets.get_mut(event) {
                subs.retain(|s| !spent.contains(&s.id));
                if subs.is_empty() {
                    state.buckets.remove(event);
                }
            }
        }

        tracing::trace!(event, delivered = report.delivered, failed = report.failed, "emitted");
        report
    }

    /// Remove one subscription by id, or a whole event. Returns whether anything was removed.
    pub fn off(&self, target: impl Into<OffTarget>) -> bool {
        let mut state = self.write();
        match target.into() {
            OffTarget::Id(id) => {
                let mut emptied = None;
                let mut found = false;
                for (event, subs) in state.buckets.iter_mut() {
                    let before = subs.len();
                    subs.retain(|s| s.id != id);
                    if subs.len() < before {
                        found = true;
                        if subs.is_empty() {
                            emptied = Some(event.clone());
                        }
                        break;
                    }
                }
                if let Some(event) = emptied {
                    state.buckets.remove(&event);
                }
                found
            }
            OffTarget::Event(event) => state.buckets.remove(&event).is_some(),
        }
    }

    /// Drop one event's subscriptions, or all of them
    pub fn clear(&self, event: Option<&str>) {
        let mut state = self.write();
        match event {
            Some(event) => {
                state.buckets.remove(event);
            }
            None => state.buckets.clear(),
        }
    }

    /// Copies of one event's subscriptions, in subscription order
    pub fn subscribers(&self, event: &str) -> Vec<Subscription> {
        self.read().buckets.get(event).cloned().unwrap_or_default()
    }

    /// Copies of every bucket
    pub fn all_subscribers(&self) -> BTreeMap<String, Vec<Subscription>> {
        self.read()
            .buckets
            .iter()
            .map(|(event, subs)| (event.clone(), subs.clone()))
            .collect()
    }

    pub fn has_subscribers(&self, event: &str) -> bool {
        self.read().buckets.get(event).is_some_and(|subs| !subs.is_empty())
    }

    /// Total subscriptions across all events
    pub fn len(&self) -> usize {
        self.read().buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, BusState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BusState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").field("subscriptions", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::testing::capture_sink;
    use crate::log::null_sink;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>) {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let l = Arc::clone(&log);
        let make = move |tag: &str| {
            let l = Arc::clone(&l);
            let tag = tag.to_string();
            Box::new(move |_: &Value| {
                l.lock().unwrap().push(tag.clone());
                Ok(())
            }) as Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn test_priority_order() {
        let bus = EventBus::new(null_sink());
        let (log, make) = recorder();
        bus.on("ev", make("zero"), SubscribeOptions::default()).unwrap();
        bus.on("ev", make("low"), SubscribeOptions::default().priority(-5)).unwrap();
        bus.on("ev", make("high"), SubscribeOptions::default().priority(10)).unwrap();

        bus.emit("ev", &Value::Nil);
        assert_eq!(*log.lock().unwrap(), vec!["high", "zero", "low"]);
    }

    #[test]
    fn test_equal_priority_keeps_subscription_order() {
        let bus = EventBus::new(null_sink());
        let (log, make) = recorder();
        for tag in ["a", "b", "c"] {
            bus.on("ev", make(tag), SubscribeOptions::default()).unwrap();
        }
        bus.emit("ev", &Value::Nil);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_once_fires_once() {
        let bus = EventBus::new(null_sink());
        let (log, make) = recorder();
        bus.on("ev", make("once"), SubscribeOptions::default().once()).unwrap();
        bus.on("ev", make("always"), SubscribeOptions::default()).unwrap();

        bus.emit("ev", &Value::Nil);
        bus.emit("ev", &Value::Nil);
        assert_eq!(*log.lock().unwrap(), vec!["once", "always", "always"]);
        assert_eq!(bus.subscribers("ev").len(), 1);
    }

    #[test]
    fn test_failing_handler_is_isolated() {
        let (sink, captured) = capture_sink();
        let bus = EventBus::new(sink);
        let (log, make) = recorder();
        bus.on("ev", |_| anyhow::bail!("bad handler"), SubscribeOptions::default().priority(5))
            .unwrap();
        bus.on("ev", |_| panic!("worse handler"), SubscribeOptions::default().priority(4))
            .unwrap();
        bus.on("ev", make("after"), SubscribeOptions::default()).unwrap();

        let report = bus.emit("ev", &Value::Nil);
        assert_eq!(report, EmitReport { delivered: 1, failed: 2 });
        assert_eq!(*log.lock().unwrap(), vec!["after"]);

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].0, "Error in handler for event 'ev': bad handler");
        assert_eq!(captured[0].1, Severity::Error);
        assert!(captured[1].0.contains("worse handler"));
    }

    #[test]
    fn test_payload_is_delivered() {
        let bus = EventBus::new(null_sink());
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let s = Arc::clone(&seen);
        bus.on(
            "plugin:loaded",
            move |payload| {
                *s.lock().unwrap() = Some(payload.clone());
                Ok(())
            },
            SubscribeOptions::default(),
        )
        .unwrap();
        bus.emit("plugin:loaded", &Value::from("telescope"));
        assert_eq!(*seen.lock().unwrap(), Some(Value::from("telescope")));
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let bus = EventBus::new(null_sink());
        assert_eq!(bus.emit("nothing", &Value::Nil), EmitReport::default());
    }

    #[test]
    fn test_rejects_empty_event_and_non_functions() {
        let bus = EventBus::new(null_sink());
        assert_eq!(
            bus.on("", |_| Ok(()), SubscribeOptions::default()),
            Err(EventError::EmptyEventName)
        );
        assert!(matches!(
            bus.subscribe_value("ev", &Value::from(1), SubscribeOptions::default()),
            Err(EventError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_ids_increase() {
        let bus = EventBus::new(null_sink());
        let a = bus.on("a", |_| Ok(()), SubscribeOptions::default()).unwrap();
        let b = bus.on("b", |_| Ok(()), SubscribeOptions::default()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_off_by_id_and_event() {
        let bus = EventBus::new(null_sink());
        let a = bus.on("a", |_| Ok(()), SubscribeOptions::default()).unwrap();
        bus.on("a", |_| Ok(()), SubscribeOptions::default()).unwrap();
        bus.on("b", |_| Ok(()), SubscribeOptions::default()).unwrap();

        assert!(bus.off(a));
        assert!(!bus.off(a));
        assert_eq!(bus.subscribers("a").len(), 1);

        assert!(bus.off("b"));
        assert!(!bus.has_subscribers("b"));
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new(null_sink());
        bus.on("a", |_| Ok(()), SubscribeOptions::default()).unwrap();
        bus.on("b", |_| Ok(()), SubscribeOptions::default()).unwrap();

        bus.clear(Some("a"));
        assert_eq!(bus.all_subscribers().keys().collect::<Vec<_>>(), vec!["b"]);
        bus.clear(None);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_handler_may_subscribe_during_emit() {
        let bus = EventBus::new(null_sink());
        let inner = bus.clone();
        bus.on(
            "ev",
            move |_| {
                inner.on("other", |_| Ok(()), SubscribeOptions::default())?;
                Ok(())
            },
            SubscribeOptions::default(),
        )
        .unwrap();
        let report = bus.emit("ev", &Value::Nil);
        assert_eq!(report.failed, 0);
        assert!(bus.has_subscribers("other"));
    }
}
