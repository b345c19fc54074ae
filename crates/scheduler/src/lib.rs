//! The scheduler (§4.7 C7): named periodic tasks, each its own cooperative
//! `tokio` task, sharing one `Store`/`HttpFetcher`/`RetryFabric`/adapter.
//!
//! Grounded in the teacher's `crates/worker/src/lib.rs` (`run_worker_loop`): catch
//! and log every failure at the top of the task body so it never stops the loop,
//! and tear down cooperatively on a `CancellationToken` rather than aborting tasks
//! outright. The teacher's loop is a single job-queue consumer; this one is five
//! independent named drivers with different cadences (§4.5's "three periodic
//! drivers share the same configuration" plus the feed-poll and monitor-refresh
//! tasks), so each gets its own `tokio::time::interval` rather than one shared
//! poll loop.

pub mod config;
pub mod guild_tz;
pub mod monitor;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use syncd_adapter::ChatAdapter;
use syncd_core::config::CoreConfig;
use syncd_net::{HttpFetcher, RetryFabric};
use syncd_store::Store;

use config::SchedulerIntervals;
use guild_tz::GuildTzMap;

/// How long the scheduler waits, between polls of `ChatAdapter::is_ready`, before
/// starting any task (§4.7 "before_ready hook").
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long a shutdown waits for in-flight ticks to finish before giving up on
/// graceful cancellation (§5 "tasks receive a cancel signal... database commits in
/// progress are awaited up to 10s" generalized to the whole scheduler, since every
/// task here is a short-lived per-tick body rather than a single long transaction).
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

/// The five named periodic drivers (§4.7), sharing one set of collaborators.
pub struct Scheduler<A: ChatAdapter> {
    store: Store,
    fetcher: HttpFetcher,
    retry: RetryFabric,
    adapter: Arc<A>,
    core: CoreConfig,
    intervals: SchedulerIntervals,
}

impl<A: ChatAdapter> Scheduler<A> {
    #[must_use]
    pub fn new(store: Store, fetcher: HttpFetcher, retry: RetryFabric, adapter: A, core: CoreConfig) -> Self {
        let intervals = SchedulerIntervals::from_feed_poll_secs(core.poll_interval_secs);
        Self {
            store,
            fetcher,
            retry,
            adapter: Arc::new(adapter),
            core,
            intervals,
        }
    }

    /// Wait for the chat adapter's own startup handshake, then spawn every named
    /// task, and block until `shutdown` is cancelled — at which point every task is
    /// given up to `shutdown_deadline` to finish its in-flight tick before the
    /// scheduler returns regardless. Returns `false` if the deadline elapsed with
    /// tasks still in flight, so the caller can turn that into a non-zero exit
    /// status (§4.9).
    #[must_use]
    pub async fn run(self, shutdown: CancellationToken, shutdown_deadline: Duration) -> bool {
        self.wait_until_ready(&shutdown).await;
        if shutdown.is_cancelled() {
            return true;
        }

        let store = self.store;
        let fetcher = self.fetcher;
        let retry = Arc::new(self.retry);
        let adapter = self.adapter;
        let core = self.core;
        let intervals = self.intervals;

        let mut handles = Vec::new();

        handles.push(spawn_periodic("feed_poll", intervals.feed_poll, shutdown.clone(), {
            let store = store.clone();
            let fetcher = fetcher.clone();
            let retry = retry.clone();
            let adapter = adapter.clone();
            let core = core.clone();
            move || {
                let store = store.clone();
                let fetcher = fetcher.clone();
                let retry = retry.clone();
                let adapter = adapter.clone();
                let core = core.clone();
                async move { feed_poll_tick(&store, &fetcher, &retry, &*adapter, &core).await }
            }
        }));

        handles.push(spawn_periodic("calendar_sync", intervals.calendar_sync, shutdown.clone(), {
            let store = store.clone();
            let fetcher = fetcher.clone();
            let retry = retry.clone();
            let adapter = adapter.clone();
            move || {
                let store = store.clone();
                let fetcher = fetcher.clone();
                let retry = retry.clone();
                let adapter = adapter.clone();
                async move {
                    let tz = GuildTzMap::load(&store).await;
                    syncd_calendar::sync::sync_all_calendars(&store, &fetcher, &retry, &*adapter, |g| tz.resolve(g)).await;
                }
            }
        }));

        handles.push(spawn_periodic("event_status", intervals.event_status, shutdown.clone(), {
            let store = store.clone();
            let adapter = adapter.clone();
            move || {
                let store = store.clone();
                let adapter = adapter.clone();
                async move { syncd_calendar::status::run_event_status_tick(&store, &*adapter).await }
            }
        }));

        handles.push(spawn_periodic("reminder", intervals.reminder, shutdown.clone(), {
            let store = store.clone();
            let adapter = adapter.clone();
            move || {
                let store = store.clone();
                let adapter = adapter.clone();
                async move { syncd_calendar::reminder::run_reminder_tick(&store, &*adapter).await }
            }
        }));

        handles.push(spawn_periodic("monitor_refresh", intervals.monitor_refresh, shutdown.clone(), {
            let store = store.clone();
            let adapter = adapter.clone();
            move || {
                let store = store.clone();
                let adapter = adapter.clone();
                async move { monitor::run_monitor_refresh_tick(&store, &*adapter, monitor::default_render).await }
            }
        }));

        shutdown.cancelled().await;
        tracing::info!("scheduler received shutdown signal, draining in-flight ticks");

        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(shutdown_deadline, drain).await.is_err() {
            tracing::warn!("scheduler shutdown deadline elapsed with tasks still in flight");
            return false;
        }
        true
    }

    async fn wait_until_ready(&self, shutdown: &CancellationToken) {
        while !self.adapter.is_ready() {
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(READY_POLL_INTERVAL) => {}
            }
        }
    }
}

async fn feed_poll_tick<A: ChatAdapter>(store: &Store, fetcher: &HttpFetcher, retry: &RetryFabric, adapter: &A, core: &CoreConfig) {
    let tz = GuildTzMap::load(store).await;
    syncd_feeds::poll::poll_all_feeds(
        store,
        fetcher,
        retry,
        adapter,
        chrono::Duration::seconds(core.max_post_age_secs),
        i32::try_from(core.failure_threshold).unwrap_or(i32::MAX),
        |g| tz.resolve(g),
    )
    .await;

    // §4.3: the retry-fabric idle sweep has no independent trigger; it is
    // piggybacked on this driver's own tick rather than a dedicated task.
    retry.cleanup_older_than(Utc::now() - chrono::Duration::hours(24));
}

/// Spawn one named task that ticks on `interval`, running `body()` to completion
/// before the next tick can fire (so a single task never overlaps itself — §5 "the
/// next tick does not overlap a still-running previous tick for the same task").
/// Every failure inside `body` is expected to have already been caught and logged
/// by the driver it calls (§4.4.2/§4.5's per-guild/per-feed isolation); this
/// wrapper only guards against the task itself panicking and logs slow ticks.
fn spawn_periodic<F, Fut>(name: &'static str, interval: Duration, shutdown: CancellationToken, mut make_body: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let started = tokio::time::Instant::now();
                    make_body().instrument(tracing::info_span!("scheduler_tick", task = name)).await;

                    let elapsed = started.elapsed();
                    if elapsed > interval * 2 {
                        tracing::warn!(task = name, elapsed_secs = elapsed.as_secs_f64(), "scheduler tick took more than twice its interval");
                    }
                }
            }
        }
        tracing::info!(task = name, "scheduler task stopped");
    })
}
