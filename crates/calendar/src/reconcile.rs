//! Platform scheduled-event reconciliation against the `CalendarEventLink`
//! projection (§4.5.3).

use syncd_adapter::ChatAdapter;
use syncd_core::models::{CalendarConfig, CalendarEventLink};
use syncd_core::SyncError;
use syncd_store::Store;

use crate::parse::CalendarEvent;

const DESCRIPTION_MAX_LEN: usize = 1000;

/// Reconcile one calendar's weekly set against its current `CalendarEventLink`s:
/// create platform events for newly-filtered entries, edit ones whose schedule
/// changed, and delete links for entries no longer in the weekly set.
pub async fn reconcile_events<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    config: &CalendarConfig,
    weekly_set: &[CalendarEvent],
) -> Result<(), SyncError> {
    let links = store.calendars.list_event_links(config.id).await.map_err(sync_err)?;

    for event in weekly_set {
        match links.iter().find(|l| l.event_title == event.title) {
            Some(link) => edit_if_changed(store, adapter, config, link, event).await?,
            None => create_event(store, adapter, config, event).await?,
        }
    }

    let current_titles: Vec<&str> = weekly_set.iter().map(|e| e.title.as_str()).collect();
    for link in &links {
        if !current_titles.contains(&link.event_title.as_str()) {
            remove_link(store, adapter, config, link).await?;
        }
    }

    Ok(())
}

async fn create_event<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    config: &CalendarConfig,
    event: &CalendarEvent,
) -> Result<(), SyncError> {
    let description = truncate(&event.description, DESCRIPTION_MAX_LEN);
    let event_id = adapter
        .create_scheduled_event(
            config.guild_id,
            &event.title,
            event.start,
            event.end,
            &description,
            config.voice_channel_id,
        )
        .await?;
    store
        .calendars
        .upsert_event_link(config.id, &event.title, event_id)
        .await
        .map_err(sync_err)
}

async fn edit_if_changed<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    config: &CalendarConfig,
    link: &CalendarEventLink,
    event: &CalendarEvent,
) -> Result<(), SyncError> {
    let snapshot = match adapter.fetch_scheduled_event(config.guild_id, link.platform_event_id).await {
        Ok(snapshot) => snapshot,
        Err(SyncError::NotFound(_)) => {
            // The platform event vanished out from under us; recreate it.
            return create_event(store, adapter, config, event).await;
        }
        Err(err) => return Err(err),
    };

    let description = truncate(&event.description, DESCRIPTION_MAX_LEN);
    let changed = snapshot.start != event.start || snapshot.end != event.end || snapshot.description != description;
    if !changed {
        return Ok(());
    }

    match adapter
        .edit_scheduled_event(config.guild_id, link.platform_event_id, &event.title, event.start, event.end, &description)
        .await
    {
        Ok(()) => Ok(()),
        // A same-channel start/end collision is transient by nature of the clock;
        // next tick will retry (§4.5.3).
        Err(err) if !err.counts_toward_failure_threshold() => {
            tracing::debug!(calendar_id = %config.id, title = %event.title, error = %err, "scheduled event edit deferred to next tick");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

async fn remove_link<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    config: &CalendarConfig,
    link: &CalendarEventLink,
) -> Result<(), SyncError> {
    match adapter.delete_scheduled_event(config.guild_id, link.platform_event_id).await {
        Ok(()) | Err(SyncError::NotFound(_)) => {}
        Err(err) => return Err(err),
    }
    store.calendars.delete_event_link(config.id, &link.event_title).await.map_err(sync_err)
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    text.chars().take(max_len).collect()
}

fn sync_err(err: SyncError) -> SyncError {
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "x".repeat(1200);
        assert_eq!(truncate(&long, DESCRIPTION_MAX_LEN).chars().count(), DESCRIPTION_MAX_LEN);
    }

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate("hello", DESCRIPTION_MAX_LEN), "hello");
    }
}
