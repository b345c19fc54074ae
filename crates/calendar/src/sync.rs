//! The calendar sync driver (§4.5 "Sync driver", hourly): fetch iCal, expand
//! recurrences, filter, reconcile the weekly summary message and platform events.

use chrono::Utc;
use chrono_tz::Tz;
use syncd_adapter::ChatAdapter;
use syncd_core::models::CalendarConfig;
use syncd_core::timezone::{week_end, week_start_monday};
use syncd_core::SyncError;
use syncd_net::{ConditionalState, FetchOutcome, HttpFetcher, RetryFabric};
use syncd_store::Store;

use crate::filter::filter_events;
use crate::parse::{parse_and_expand, EXPANSION_WINDOW_DAYS};
use crate::reconcile::reconcile_events;
use crate::weekly::{render_summary, weekly_set};

/// Sync every configured calendar once. Per-calendar failures never affect other
/// calendars, mirroring the feed engine's isolation (§4.4.2 analogue for C5).
pub async fn sync_all_calendars<A: ChatAdapter>(
    store: &Store,
    fetcher: &HttpFetcher,
    retry: &RetryFabric,
    adapter: &A,
    guild_tz: impl Fn(syncd_core::types::GuildId) -> Tz,
) {
    let calendars = match store.calendars.list_all().await {
        Ok(calendars) => calendars,
        Err(err) => {
            tracing::error!(error = %err, "failed to list calendars");
            return;
        }
    };

    for config in calendars {
        let tz = guild_tz(config.guild_id);
        if let Err(err) = sync_one_calendar(store, fetcher, retry, adapter, &config, &tz).await {
            tracing::warn!(calendar_id = %config.id, error = %err, "calendar sync failed");
        }
    }
}

async fn sync_one_calendar<A: ChatAdapter>(
    store: &Store,
    fetcher: &HttpFetcher,
    retry: &RetryFabric,
    adapter: &A,
    config: &CalendarConfig,
    guild_tz: &Tz,
) -> Result<(), SyncError> {
    let op_id = format!("sync_calendar:{}", config.id);
    let body = fetch_with_retry(fetcher, retry, &op_id, &config.source_url).await?;

    let now = Utc::now();
    let range_start = now;
    let range_end = now + chrono::Duration::days(EXPANSION_WINDOW_DAYS);
    let events = parse_and_expand(&body, range_start, range_end)?;
    let filtered = filter_events(events, &config.whitelist, &config.blacklist);

    let week_start = week_start_monday(now, guild_tz);
    let week_end_ts = week_end(week_start);
    let weekly = weekly_set(filtered, week_start, week_end_ts);

    reconcile_events(store, adapter, config, &weekly).await?;

    // Re-read the links after reconciliation so the summary hyperlinks reflect
    // events created in this same pass (§4.5.2's "hyperlink when a platform
    // event exists for that title").
    let links = store.calendars.list_event_links(config.id).await.map_err(sync_err)?;
    let summary = render_summary(config.guild_id, &weekly, &links, guild_tz);

    let week_rolled_over = config.current_week_start != week_start;
    if week_rolled_over || config.last_summary_message_id.is_none() {
        if let Some(old_message_id) = config.last_summary_message_id {
            if let Err(err) = adapter.delete_message(config.text_channel_id, old_message_id).await {
                tracing::debug!(calendar_id = %config.id, error = %err, "best-effort delete of previous weekly summary failed");
            }
        }
        let message_id = adapter.send_message(config.text_channel_id, summary).await?;
        store
            .calendars
            .update_weekly_summary(config.id, Some(message_id), week_start, now)
            .await
            .map_err(sync_err)?;
    } else {
        let message_id = config.last_summary_message_id;
        if let Some(message_id) = message_id {
            adapter.edit_message(config.text_channel_id, message_id, summary).await?;
        }
        store
            .calendars
            .update_weekly_summary(config.id, message_id, week_start, now)
            .await
            .map_err(sync_err)?;
    }

    Ok(())
}

async fn fetch_with_retry(
    fetcher: &HttpFetcher,
    retry: &RetryFabric,
    op_id: &str,
    url: &str,
) -> Result<String, SyncError> {
    let conditional = ConditionalState::default();
    loop {
        match fetcher.fetch_conditional(url, &conditional).await {
            Ok(FetchOutcome::Fetched { body, .. } | FetchOutcome::Unchanged { body, .. }) => {
                retry.note_success(op_id, Utc::now());
                return Ok(body);
            }
            Ok(FetchOutcome::NotModified) => {
                // Unreachable without conditional headers, but treated as an empty
                // body rather than panicking if a future fetcher start setting them.
                retry.note_success(op_id, Utc::now());
                return Ok(String::new());
            }
            Err(err) => {
                retry.note_failure(op_id, &err, Utc::now());
                if !retry.should_retry(op_id, &err) {
                    return Err(err);
                }
                tokio::time::sleep(retry.next_delay(op_id)).await;
            }
        }
    }
}

fn sync_err(err: SyncError) -> SyncError {
    err
}
