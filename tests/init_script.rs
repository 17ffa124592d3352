use std::fs;

use lark_core::config::Settings;
use lark_core::log::null_sink;
use lark_core::plugins::PluginFilter;
use lark_core::scripting::ScriptError;
use lark_core::{Runtime, RuntimeError, Value};
use pretty_assertions::assert_eq;

const INIT: &str = r#"
lark::plugins::register("plenary");
lark::plugins::register("telescope", #{
    dependencies: ["plenary"],
    config: || lark::events::on("picker:open", |name| name),
});
lark::plugins::register("neogit", #{ lazy: true, cmd: ["Neogit", "NeogitCommit"] });

lark::schema::define("statusline", #{
    theme: #{ type: "string", "default": "auto" },
    sections: #{ type: "array", "default": ["mode", "branch"] },
});

lark::events::on("plugin:loaded", |name| (), #{ priority: 10 });
"#;

fn runtime_in(dir: &tempfile::TempDir) -> Runtime {
    let mut settings = Settings::empty();
    settings.add_module_path(dir.path().join("modules"));
    Runtime::with_settings(settings, null_sink())
}

#[test]
fn bootstrap_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let init = dir.path().join("init.rhai");
    fs::write(&init, INIT).unwrap();

    let mut runtime = runtime_in(&dir);
    let report = runtime.bootstrap_file(&init).unwrap().unwrap();

    assert_eq!(report.loaded, vec!["plenary", "telescope"]);
    let lazy: Vec<String> = runtime
        .plugins()
        .list(PluginFilter::default().loaded(false))
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(lazy, vec!["neogit"]);
    assert_eq!(
        runtime.plugins().get("neogit").unwrap().spec.cmd,
        vec!["Neogit".to_string(), "NeogitCommit".to_string()]
    );

    // telescope's config subscribed a handler after the script finished
    assert!(runtime.events().has_subscribers("picker:open"));
    assert!(runtime.events().has_subscribers("plugin:loaded"));

    let merged = runtime
        .schemas()
        .merge("statusline", &Value::record([("theme", "dark")]))
        .unwrap();
    assert_eq!(merged.get("theme"), &Value::from("dark"));
    assert_eq!(merged.get("sections"), &Value::array(["mode", "branch"]));
}

#[test]
fn missing_init_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = runtime_in(&dir);
    let err = runtime.bootstrap_file(&dir.path().join("nope.rhai")).unwrap_err();
    assert!(matches!(err, ScriptError::Io { .. }));
}

#[test]
fn failing_script_applies_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = runtime_in(&dir);
    let err = runtime
        .bootstrap(
            r#"
            lark::plugins::register("a");
            let x = 1 / 0;
        "#,
        )
        .unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(_)));
    assert!(runtime.plugins().is_empty());
}

#[test]
fn require_script_module() {
    let dir = tempfile::tempdir().unwrap();
    let modules = dir.path().join("modules");
    fs::create_dir_all(modules.join("ui")).unwrap();
    fs::write(
        modules.join("ui").join("init.rhai"),
        r#"
        lark::plugins::register("ui-core");
        let border = "rounded";
        fn setup() { true }
        "#,
    )
    .unwrap();
    fs::write(modules.join("broken.rhai"), "fn setup() { false }").unwrap();

    let mut runtime = runtime_in(&dir);
    let module = runtime.require("ui").unwrap();
    assert_eq!(module.exports.get("border"), &Value::from("rounded"));
    assert!(runtime.plugins().get("ui-core").is_some());
    assert!(runtime.modules().is_loaded("ui"));

    let err = runtime.require("broken").unwrap_err();
    assert!(matches!(err, RuntimeError::Module(_)));
    assert_eq!(runtime.modules().loaded_modules(Some("^u")).unwrap(), vec!["ui"]);

    let err = runtime.require("absent").unwrap_err().to_string();
    assert!(err.contains("absent.rhai"));
}
