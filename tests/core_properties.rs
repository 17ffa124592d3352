use std::sync::{Arc, Mutex};

use lark_core::events::{EventBus, SubscribeOptions};
use lark_core::log::{LogSink, Severity, null_sink};
use lark_core::plugins::{PluginError, PluginRegistry, PluginSpec};
use lark_core::schema::{Fields, FieldSchema, SchemaRegistry};
use lark_core::value::deep_merge;
use lark_core::{Runtime, Table, Value};
use pretty_assertions::assert_eq;

fn capture() -> (LogSink, Arc<Mutex<Vec<(String, Severity)>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let c = Arc::clone(&captured);
    let sink: LogSink = Arc::new(move |msg: &str, sev: Severity| c.lock().unwrap().push((msg.to_string(), sev)));
    (sink, captured)
}

fn registry() -> PluginRegistry {
    PluginRegistry::new(EventBus::new(null_sink()), null_sink())
}

#[test]
fn merge_replaces_arrays_and_merges_records() {
    let base = Value::record([("a", Value::record([("x", 1), ("y", 2)]))]);
    let overrides = Value::record([("a", Value::record([("x", 9)]))]);
    assert_eq!(
        deep_merge(&base, &overrides),
        Value::record([("a", Value::record([("x", 9), ("y", 2)]))])
    );

    let base = Value::record([("a", Value::array([1, 2, 3]))]);
    let overrides = Value::record([("a", Value::array([4, 5]))]);
    let merged = deep_merge(&base, &overrides);
    assert_eq!(merged, Value::record([("a", Value::array([4, 5]))]));
    assert_eq!(merged.get("a").as_table().unwrap().len(), 2);
}

#[test]
fn merge_result_does_not_alias_inputs() {
    let base = Value::record([("a", Value::record([("x", 1)]))]);
    let overrides = Value::record([("b", Value::array([1]))]);
    let mut merged = deep_merge(&base, &overrides);

    let table = merged.as_table_mut().unwrap();
    table.insert("c", 3);
    if let Some(inner) = table.get_mut("a").and_then(Value::as_table_mut) {
        inner.insert("x", 100);
    }

    assert_eq!(base, Value::record([("a", Value::record([("x", 1)]))]));
    assert_eq!(overrides, Value::record([("b", Value::array([1]))]));
}

#[test]
fn schema_merge_is_idempotent() {
    let mut schemas = SchemaRegistry::new();
    let fields: Fields = [
        ("port".to_string(), FieldSchema::number().default(8080)),
        (
            "tls".to_string(),
            FieldSchema::record([("enabled", FieldSchema::boolean().default(false))]),
        ),
        ("hosts".to_string(), FieldSchema::array().default(Value::array(["a", "b"]))),
    ]
    .into_iter()
    .collect();
    schemas.define("server", fields).unwrap();

    let user = Value::record([("hosts", Value::array(["c"]))]);
    let once = schemas.merge("server", &user).unwrap();
    let twice = schemas.merge("server", &once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.get("hosts"), &Value::array(["c"]));
    assert_eq!(once.get("port"), &Value::from(8080));
    // `tls` declares no default of its own, so merge leaves it out
    assert_eq!(once.get("tls"), &Value::Nil);
}

#[test]
fn cycle_leaves_nothing_loaded() {
    let plugins = registry();
    plugins.register("A", PluginSpec::new().depends_on("B")).unwrap();
    plugins.register("B", PluginSpec::new().depends_on("A")).unwrap();

    let err = plugins.load("A").unwrap_err();
    assert!(matches!(err, PluginError::Cycle { .. }));
    assert!(!plugins.is_loaded("A"));
    assert!(!plugins.is_loaded("B"));
}

#[test]
fn dependencies_configure_first() {
    let plugins = registry();
    let counter = Arc::new(Mutex::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["base", "dependent"] {
        let counter = Arc::clone(&counter);
        let order = Arc::clone(&order);
        let mut spec = PluginSpec::new().config(move || {
            let mut n = counter.lock().unwrap();
            *n += 1;
            order.lock().unwrap().push((name, *n));
            Ok(())
        });
        if name == "dependent" {
            spec = spec.depends_on("base");
        }
        plugins.register(name, spec).unwrap();
    }

    plugins.load("dependent").unwrap();
    assert_eq!(*order.lock().unwrap(), vec![("base", 1), ("dependent", 2)]);
}

#[test]
fn priority_dispatch_order() {
    let events = EventBus::new(null_sink());
    let calls = Arc::new(Mutex::new(Vec::new()));
    for priority in [0, -5, 10] {
        let calls = Arc::clone(&calls);
        events
            .on(
                "tick",
                move |_| {
                    calls.lock().unwrap().push(priority);
                    Ok(())
                },
                SubscribeOptions::default().priority(priority),
            )
            .unwrap();
    }

    events.emit("tick", &Value::Nil);
    assert_eq!(*calls.lock().unwrap(), vec![10, 0, -5]);
}

#[test]
fn once_fires_exactly_once() {
    let events = EventBus::new(null_sink());
    let count = Arc::new(Mutex::new(0));
    let c = Arc::clone(&count);
    events
        .on(
            "boot",
            move |_| {
                *c.lock().unwrap() += 1;
                Ok(())
            },
            SubscribeOptions::default().once(),
        )
        .unwrap();

    events.emit("boot", &Value::Nil);
    events.emit("boot", &Value::Nil);
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn failing_handler_does_not_stop_dispatch() {
    let (sink, captured) = capture();
    let events = EventBus::new(sink);
    events
        .on("save", |_| anyhow::bail!("disk full"), SubscribeOptions::default().priority(1))
        .unwrap();
    events.on("save", |_| Ok(()), SubscribeOptions::default()).unwrap();

    let report = events.emit("save", &Value::Nil);
    assert_eq!((report.delivered, report.failed), (1, 1));
    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].1, Severity::Error);
    assert!(captured[0].0.contains("disk full"));
}

#[test]
fn validation_reports_every_field() {
    let mut schemas = SchemaRegistry::new();
    let fields: Fields = [
        ("name".to_string(), FieldSchema::string()),
        ("age".to_string(), FieldSchema::number()),
    ]
    .into_iter()
    .collect();
    schemas.define("person", fields).unwrap();

    let err = schemas
        .validate("person", &Value::record([("name", Value::from(123)), ("age", Value::from("x"))]))
        .unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get("name"), Some("Expected string, got number"));
    assert_eq!(errors.get("age"), Some("Expected number, got string"));
}

#[test]
fn required_port_with_range() {
    let mut schemas = SchemaRegistry::new();
    let port = FieldSchema::number().required().validator(|v| match v.as_number() {
        Some(n) if (1.0..=65535.0).contains(&n) => Ok(()),
        _ => Err("port must be between 1 and 65535".to_string()),
    });
    schemas
        .define("server", [("port".to_string(), port)].into_iter().collect())
        .unwrap();

    let err = schemas.validate("server", &Value::Table(Table::new())).unwrap_err();
    assert_eq!(err.validation_errors().unwrap().get("port"), Some("Required field is missing"));

    assert!(schemas.validate("server", &Value::record([("port", 8080)])).is_ok());

    let err = schemas.validate("server", &Value::record([("port", 99999)])).unwrap_err();
    assert_eq!(
        err.validation_errors().unwrap().get("port"),
        Some("port must be between 1 and 65535")
    );
}

#[test]
fn runtime_reports_through_its_sink() {
    let (sink, captured) = capture();
    let runtime = Runtime::with_settings(lark_core::config::Settings::empty(), sink);
    runtime
        .plugins()
        .register("broken", PluginSpec::new().config(|| anyhow::bail!("bad option")))
        .unwrap();

    assert!(runtime.plugins().load("broken").is_err());
    assert!(!runtime.plugins().is_loaded("broken"));
    let captured = captured.lock().unwrap();
    assert!(
        captured
            .iter()
            .any(|(msg, sev)| *sev == Severity::Error && msg == "Failed to configure plugin 'broken': bad option")
    );
}
