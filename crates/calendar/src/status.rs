//! Event-status tick (§4.5.4): transition tracked platform events through
//! scheduled → active → completed as wall-clock time passes.

use chrono::Utc;
use syncd_adapter::{ChatAdapter, ScheduledEventState};
use syncd_core::models::CalendarConfig;
use syncd_core::SyncError;
use syncd_store::Store;

pub async fn run_event_status_tick<A: ChatAdapter>(store: &Store, adapter: &A) {
    let configs = match store.calendars.list_all().await {
        Ok(configs) => configs,
        Err(err) => {
            tracing::error!(error = %err, "failed to list calendars for event-status tick");
            return;
        }
    };

    for config in configs {
        if let Err(err) = tick_one_calendar(store, adapter, &config).await {
            tracing::warn!(calendar_id = %config.id, error = %err, "event-status tick failed for calendar");
        }
    }
}

async fn tick_one_calendar<A: ChatAdapter>(store: &Store, adapter: &A, config: &CalendarConfig) -> Result<(), SyncError> {
    let links = store.calendars.list_event_links(config.id).await?;
    let now = Utc::now();

    for link in &links {
        let snapshot = match adapter.fetch_scheduled_event(config.guild_id, link.platform_event_id).await {
            Ok(snapshot) => snapshot,
            Err(SyncError::NotFound(_)) => {
                store.calendars.delete_event_link(config.id, &link.event_title).await?;
                continue;
            }
            Err(err) => {
                tracing::warn!(calendar_id = %config.id, title = %link.event_title, error = %err, "failed to fetch scheduled event state");
                continue;
            }
        };

        match snapshot.state {
            ScheduledEventState::Scheduled if snapshot.start <= now => {
                adapter.start_scheduled_event(config.guild_id, link.platform_event_id).await?;
            }
            ScheduledEventState::Active if snapshot.end.is_some_and(|end| end <= now) => {
                adapter.end_scheduled_event(config.guild_id, link.platform_event_id).await?;
            }
            _ => {}
        }
    }

    Ok(())
}
