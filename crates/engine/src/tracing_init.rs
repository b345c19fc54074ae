//! Structured logging bootstrap (§4.9, §10.3): a human-readable stdout layer and a
//! JSON rolling-file layer, both live from process start.
//!
//! Grounded verbatim in the teacher's `crates/server/src/main.rs::init_tracing`: same
//! two-layer `tracing_subscriber::registry()`, same `EnvFilter` default chain, same
//! `tracing_appender::rolling::daily` + `non_blocking` pairing so file writes never
//! block a scheduler tick.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes the global subscriber. The returned guard must be held for the
/// life of the process — dropping it early stops the file layer from flushing.
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,syncd_scheduler=debug,syncd_feeds=debug,syncd_calendar=debug,syncd_map=debug,sqlx=warn".into());

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(true);

    let registry = tracing_subscriber::registry().with(env_filter).with(stdout_layer);

    let enable_file_logging = std::env::var("ENABLE_FILE_LOGGING")
        .map(|v| v.to_lowercase() != "false" && v != "0")
        .unwrap_or(true);

    if enable_file_logging {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let file_appender = tracing_appender::rolling::daily(log_dir, "syncd.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking).json();

        registry.with(file_layer).init();
        Ok(Some(guard))
    } else {
        registry.init();
        Ok(None)
    }
}
