//! Monitor-refresh tick (§4.7 "monitor refresh", §3 `MonitorMessage`).
//!
//! The monitor widgets' own content (system/server statistics) is rendered by the
//! interactive command surface that owns them — out of scope per §1 ("the operator
//! dashboard and log viewer"). What the core owns is the mechanics: finding rows
//! whose `refresh_interval_secs` has elapsed and re-editing them in place, which is
//! exactly what `ModerationRepo::list_due_monitors` is for.

use chrono::Utc;
use syncd_adapter::{ChatAdapter, OutboundMessage};
use syncd_core::models::MonitorMessage;
use syncd_core::SyncError;
use syncd_store::Store;

/// Refresh every monitor message whose interval has elapsed. `render` produces the
/// message body for one monitor; the driver only owns the due-check, the edit, and
/// the timestamp bookkeeping.
pub async fn run_monitor_refresh_tick<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    render: impl Fn(&MonitorMessage) -> OutboundMessage,
) {
    let due = match store.moderation.list_due_monitors(Utc::now()).await {
        Ok(due) => due,
        Err(err) => {
            tracing::error!(error = %err, "failed to list due monitor messages");
            return;
        }
    };

    for monitor in due {
        let message = render(&monitor);
        match adapter.edit_message(monitor.channel_id, monitor.message_id, message).await {
            Ok(()) | Err(SyncError::NotFound(_)) => {}
            Err(err) => {
                tracing::warn!(channel_id = %monitor.channel_id, error = %err, "failed to refresh monitor message");
                continue;
            }
        }
        if let Err(err) = store
            .moderation
            .upsert_monitor(monitor.channel_id, monitor.monitor_type, monitor.message_id, Utc::now(), monitor.refresh_interval_secs)
            .await
        {
            tracing::warn!(channel_id = %monitor.channel_id, error = %err, "failed to persist monitor refresh timestamp");
        }
    }
}

/// The default render used when no richer content source is wired in: identifies
/// the monitor type and the refresh time, without any system/server statistics.
#[must_use]
pub fn default_render(monitor: &MonitorMessage) -> OutboundMessage {
    let label = match monitor.monitor_type {
        syncd_core::models::MonitorType::System => "System monitor",
        syncd_core::models::MonitorType::Server => "Server monitor",
    };
    OutboundMessage {
        content: Some(format!("{label} — last updated <t:{}:R>", Utc::now().timestamp())),
        embeds: Vec::new(),
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncd_core::types::{ChannelId, MessageId};

    fn monitor(monitor_type: syncd_core::models::MonitorType) -> MonitorMessage {
        MonitorMessage {
            channel_id: ChannelId::new(1),
            monitor_type,
            message_id: MessageId::new(2),
            last_update_at: Utc::now(),
            refresh_interval_secs: 60,
        }
    }

    #[test]
    fn default_render_labels_system_and_server_monitors_distinctly() {
        let system = default_render(&monitor(syncd_core::models::MonitorType::System));
        let server = default_render(&monitor(syncd_core::models::MonitorType::Server));

        assert!(system.content.unwrap().starts_with("System monitor"));
        assert!(server.content.unwrap().starts_with("Server monitor"));
    }
}
