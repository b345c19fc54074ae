//! Engine bootstrap (§4.9 C9): wires C1–C7 together and drives the process
//! lifecycle. Not itself a functional component of §1 — every other crate in this
//! workspace can be used as a library without it — but required of any complete
//! binary built on top of them.
//!
//! This crate ships no `main.rs`: C8 (the chat-surface adapter) is an interface
//! only, with no concrete implementation anywhere in this workspace, and
//! [`run`] is generic over it. A binary that supplies a concrete `ChatAdapter`
//! calls [`run`] as its entire `main`, the same way the teacher's
//! `crates/server/src/main.rs` calls into its own `api`/`bot`/`worker` crates
//! rather than inlining their logic.

pub mod config;
pub mod tracing_init;

use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use config::EngineConfig;
use syncd_adapter::ChatAdapter;
use syncd_net::{HttpFetcher, RetryFabric};
use syncd_scheduler::Scheduler;
use syncd_store::Store;

/// Every collaborator the engine assembled at startup, handed back to the caller
/// so a concrete binary can also wire an interactive command surface against the
/// same `Store`/`HttpFetcher`/map cache the scheduler uses.
pub struct Bootstrapped {
    pub config: EngineConfig,
    pub store: Store,
    pub fetcher: HttpFetcher,
    pub map_cache: syncd_map::ImageCache,
}

/// Load configuration, initialize logging, connect to the database, and run
/// pending migrations — everything in §4.9 up to "constructing C1–C7", without yet
/// requiring a chat adapter. Returns the tracing guard alongside the assembled
/// collaborators; the caller must keep the guard alive for the life of the process.
pub async fn bootstrap() -> Result<(Bootstrapped, Option<tracing_appender::non_blocking::WorkerGuard>)> {
    let config = EngineConfig::from_env()?;
    let guard = tracing_init::init_tracing()?;

    tracing::info!("starting syncd engine");

    let db_max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);

    let store = Store::connect(&config.core.database_url, db_max_connections).await?;
    tracing::info!(max_connections = db_max_connections, "database pool established, migrations applied");

    let fetcher = HttpFetcher::new(config.core.max_connections, config.core.max_connections_per_host, config.core.http_timeout())?;

    let map_cache = syncd_map::ImageCache::new(&config.map.cache_dir);

    Ok((
        Bootstrapped {
            config,
            store,
            fetcher,
            map_cache,
        },
        guard,
    ))
}

/// Bootstrap, construct the scheduler (C7) around `adapter`, and run it to
/// completion: block until a shutdown signal arrives, then drain in-flight ticks
/// within the configured deadline (§4.9's last three responsibilities). Returns an
/// error if shutdown did not complete cleanly within the deadline, so callers can
/// translate that into the non-zero exit status §4.9 requires.
pub async fn run<A: ChatAdapter>(adapter: A) -> Result<()> {
    let (bootstrapped, _guard) = bootstrap().await?;
    let Bootstrapped { config, store, fetcher, .. } = bootstrapped;

    let retry = RetryFabric::new(config.core.base_retry_delay_secs, config.core.max_retries);
    let scheduler = Scheduler::new(store, fetcher, retry, adapter, config.core.clone());

    let shutdown = CancellationToken::new();
    let shutdown_deadline = Duration::from_secs(config.shutdown_deadline_secs);

    let scheduler_shutdown = shutdown.clone();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_shutdown, shutdown_deadline).await });

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, cancelling scheduler");
    shutdown.cancel();

    match scheduler_handle.await {
        Ok(true) => {
            tracing::info!("scheduler stopped cleanly");
            Ok(())
        }
        Ok(false) => anyhow::bail!("scheduler did not shut down within {shutdown_deadline:?}"),
        Err(join_err) => anyhow::bail!("scheduler task panicked: {join_err}"),
    }
}

/// Waits for either Ctrl+C or, on Unix, SIGTERM.
///
/// Grounded in the teacher's `crates/server/src/main.rs::wait_for_shutdown`.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
