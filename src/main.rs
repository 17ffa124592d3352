use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use lark_core::Runtime;
use lark_core::log::{route_panics, tracing_sink};
use lark_core::plugins::{Plugin, PluginFilter};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LARK_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    // Contained callback panics are already reported; keep them off raw stderr
    route_panics(tracing_sink());

    // Parse command line args
    let mut json = false;
    let mut script = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => {
                println!("usage: lark-core [--json] [init-script]");
                return ExitCode::SUCCESS;
            }
            _ => script = Some(PathBuf::from(arg)),
        }
    }

    let mut runtime = Runtime::new(tracing_sink());
    let result = match &script {
        Some(path) => runtime.bootstrap_file(path),
        None => runtime.bootstrap_default(),
    };
    if let Err(err) = result {
        tracing::error!("{err}");
        return ExitCode::FAILURE;
    }

    let plugins = runtime.plugins().list(PluginFilter::default());
    if json {
        match serde_json::to_string_pretty(&plugins) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                tracing::error!("failed to serialize plugins: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_table(&plugins);
    }

    ExitCode::SUCCESS
}

fn print_table(plugins: &[Plugin]) {
    if plugins.is_empty() {
        println!("no plugins registered");
        return;
    }
    let width = plugins.iter().map(|p| p.name.len()).max().unwrap_or(0).max(6);
    println!("{:<width$}  {:<8}  {}", "PLUGIN", "STATE", "DEPENDENCIES");
    for plugin in plugins {
        let state = match (plugin.loaded, plugin.spec.lazy) {
            (true, _) => "loaded",
            (false, true) => "lazy",
            (false, false) => "pending",
        };
        println!(
            "{:<width$}  {:<8}  {}",
            plugin.name,
            state,
            plugin.spec.dependencies.join(", ")
        );
    }
}
