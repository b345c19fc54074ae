//! Reminder tick (§4.5.5): one-hour-ahead reminders for tracked events, deduped
//! by `reminder_key` and swept after 7 days.

use chrono::{Duration, Utc};
use syncd_adapter::{ChatAdapter, OutboundMessage};
use syncd_core::models::{CalendarConfig, ReminderRecord};
use syncd_core::SyncError;
use syncd_store::Store;

/// The reminder window is centered on "one hour ahead", with a ±15 min slop so a
/// 15-minute tick cadence never misses an event (§4.5.5: `[now+45m, now+75m]`).
const WINDOW_LOW_MINUTES: i64 = 45;
const WINDOW_HIGH_MINUTES: i64 = 75;

pub async fn run_reminder_tick<A: ChatAdapter>(store: &Store, adapter: &A) {
    let configs = match store.calendars.list_all().await {
        Ok(configs) => configs,
        Err(err) => {
            tracing::error!(error = %err, "failed to list calendars for reminder tick");
            return;
        }
    };

    for config in &configs {
        if let Err(err) = tick_one_calendar(store, adapter, config).await {
            tracing::warn!(calendar_id = %config.id, error = %err, "reminder tick failed for calendar");
        }
    }

    let cutoff = Utc::now() - Duration::days(ReminderRecord::RETENTION_DAYS);
    if let Err(err) = store.calendars.cleanup_reminders_older_than(cutoff).await {
        tracing::warn!(error = %err, "failed to sweep old reminder records");
    }
}

async fn tick_one_calendar<A: ChatAdapter>(store: &Store, adapter: &A, config: &CalendarConfig) -> Result<(), SyncError> {
    let now = Utc::now();
    let window_low = now + Duration::minutes(WINDOW_LOW_MINUTES);
    let window_high = now + Duration::minutes(WINDOW_HIGH_MINUTES);

    let links = store.calendars.list_event_links(config.id).await?;
    for link in &links {
        let snapshot = match adapter.fetch_scheduled_event(config.guild_id, link.platform_event_id).await {
            Ok(snapshot) => snapshot,
            Err(SyncError::NotFound(_)) => continue,
            Err(err) => {
                tracing::warn!(calendar_id = %config.id, title = %link.event_title, error = %err, "failed to fetch event for reminder check");
                continue;
            }
        };

        if snapshot.start < window_low || snapshot.start > window_high {
            continue;
        }

        // `reminder_key` bakes in the event's own start time, so a hit here already
        // means "sent for this exact occurrence" — the 2h suppression window in
        // §4.5.5 falls out for free, since two 15-minute ticks inside the same
        // 30-minute match window see the same key.
        let reminder_key = ReminderRecord::key(config.id, &link.event_title, snapshot.start);
        if store.calendars.reminder_already_sent(config.id, &reminder_key).await? {
            continue;
        }

        let mut content = format!("**{}** starts <t:{}:R>.", snapshot.name, snapshot.start.timestamp());
        if let Some(role_id) = config.reminder_role_id {
            content = format!("<@&{role_id}> {content}");
        }
        let message = OutboundMessage { content: Some(content), embeds: Vec::new(), attachments: Vec::new() };

        adapter.send_message(config.text_channel_id, message).await?;
        store.calendars.mark_reminder_sent(config.id, &reminder_key, now).await?;
    }

    Ok(())
}
