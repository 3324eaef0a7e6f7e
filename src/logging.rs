//! Logging setup via tracing

use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the process
///
/// Verbosity comes from the CLI flags; an optional per-run log file
/// captures the full record regardless of the console level.
pub fn init_logging(debug: bool, quiet: bool, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let env_filter = EnvFilter::new(format!("taskline={}", level));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;

            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_target(true)
                .with_line_number(true)
                .with_file(true);

            registry.with(file_layer).init();
        }
        None => registry.init(),
    }

    Ok(())
}

/// Default per-run log file path under the user config directory
pub fn default_log_path(workflow_name: &str) -> anyhow::Result<PathBuf> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
        .join("taskline")
        .join("logs");

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(log_dir.join(format!("{}-{}.log", workflow_name, timestamp)))
}
