use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "genstream_client=info";
const DEFAULT_LOG_FILE: &str = "genstream.logs.jsonl";

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn observability_enabled_with(lookup: &impl Fn(&str) -> Option<String>) -> bool {
    for key in ["GENSTREAM_OBSERVABILITY_ENABLED", "GENSTREAM_OBSERVABILITY"] {
        if let Some(value) = lookup(key) {
            return parse_bool_env(&value).unwrap_or(true);
        }
    }
    true
}

fn resolve_env_filter_with(
    lookup: &impl Fn(&str) -> Option<String>,
) -> tracing_subscriber::EnvFilter {
    for key in ["GENSTREAM_LOG_LEVEL", "RUST_LOG"] {
        if let Some(directives) = lookup(key)
            && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(directives)
        {
            return filter;
        }
    }
    tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)
}

/// Splits the JSONL path into directory and file name, creating the directory.
fn prepare_json_log(path_raw: &str) -> std::io::Result<(PathBuf, String)> {
    let path = PathBuf::from(path_raw);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    std::fs::create_dir_all(&dir)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    Ok((dir, file_name))
}

/// Installs a global `tracing` subscriber once per process.
///
/// The library never calls this itself; applications opt in.
///
/// Environment variables:
/// - `GENSTREAM_OBSERVABILITY_ENABLED` / `GENSTREAM_OBSERVABILITY`: enable flag (default enabled).
/// - `GENSTREAM_LOG_LEVEL`: level/filter directive (`info`, `genstream_client=debug`, ...).
/// - `RUST_LOG`: fallback filter. Without either, only this crate logs, at `info`.
/// - `GENSTREAM_JSON_LOG_PATH`: write JSONL logs to this file instead of the console.
///   If its directory cannot be created, logs go to the console and the failure is reported there.
pub fn init_observability() {
    init_observability_with(|key| std::env::var(key).ok());
}

fn init_observability_with(lookup: impl Fn(&str) -> Option<String>) {
    INIT.get_or_init(|| {
        if !observability_enabled_with(&lookup) {
            return;
        }

        let env_filter = resolve_env_filter_with(&lookup);
        let json_target = lookup("GENSTREAM_JSON_LOG_PATH")
            .map(|path_raw| prepare_json_log(&path_raw).map_err(|err| (path_raw, err)));

        match json_target {
            Some(Ok((dir, file_name))) => {
                let writer = tracing_appender::rolling::never(dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            other => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let installed = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init()
                    .is_ok();
                if let Some(Err((path, err))) = other {
                    if installed {
                        tracing::warn!(path = %path, error = %err, "JSON log path unusable; logging to console");
                    } else {
                        eprintln!("genstream: JSON log path {path} unusable ({err}); logging to console");
                    }
                }
            }
        }
    });
}
