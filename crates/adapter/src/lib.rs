//! The chat-surface adapter (§4.8 C8): a trait boundary only.
//!
//! No concrete chat-platform client is implemented in this workspace — the
//! engine is parameterized over any type implementing [`ChatAdapter`]. Every
//! other crate that needs to post, edit, or manage a scheduled event depends on
//! this trait, never on a concrete SDK.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;
use syncd_core::types::{ChannelId, GuildId, MessageId, ScheduledEventId};
use syncd_core::SyncResult;

/// One scheduled-event's lifecycle state as reported by the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEventState {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

/// A snapshot of a platform scheduled event, as returned by `fetch_scheduled_event`.
#[derive(Debug, Clone)]
pub struct ScheduledEventSnapshot {
    pub event_id: ScheduledEventId,
    pub name: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub state: ScheduledEventState,
}

/// A message payload: plain content and/or a tree of embed values (rendered by
/// the feed/calendar engines), ready for the adapter to post as-is.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embeds: Vec<Value>,
    /// Attachment bytes keyed by filename, e.g. a rendered map PNG.
    pub attachments: Vec<(String, Vec<u8>)>,
}

/// Everything the core needs from the chat platform. Every method is I/O and may
/// fail; callers classify failures per §4.4.2 / §4.5.3 rather than this trait
/// defining its own error type beyond [`syncd_core::SyncError`].
///
/// Deliberately not `async_trait`-boxed: the workspace has no concrete
/// implementation to make dyn-safe, so plain `async fn` in trait (stable since
/// Rust 1.75) is sufficient — callers are generic over `A: ChatAdapter`.
pub trait ChatAdapter: Send + Sync + 'static {
    /// Post a new message, returning its id.
    fn send_message(
        &self,
        channel: ChannelId,
        message: OutboundMessage,
    ) -> impl Future<Output = SyncResult<MessageId>> + Send;

    /// Edit an existing message in place.
    fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: OutboundMessage,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Delete a message. A `NotFound` result is treated as success by callers
    /// that only want the message gone (§4.5.2's best-effort deletes).
    fn delete_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Post via a channel webhook, used by posted-identity feeds (custom
    /// username/avatar) and audit-log/backup uploads.
    fn post_webhook(
        &self,
        webhook_url: &str,
        message: OutboundMessage,
    ) -> impl Future<Output = SyncResult<Option<MessageId>>> + Send;

    #[allow(clippy::too_many_arguments)]
    fn create_scheduled_event(
        &self,
        guild: GuildId,
        name: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        description: &str,
        voice_channel: ChannelId,
    ) -> impl Future<Output = SyncResult<ScheduledEventId>> + Send;

    fn edit_scheduled_event(
        &self,
        guild: GuildId,
        event_id: ScheduledEventId,
        name: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        description: &str,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    fn fetch_scheduled_event(
        &self,
        guild: GuildId,
        event_id: ScheduledEventId,
    ) -> impl Future<Output = SyncResult<ScheduledEventSnapshot>> + Send;

    fn start_scheduled_event(
        &self,
        guild: GuildId,
        event_id: ScheduledEventId,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    fn end_scheduled_event(
        &self,
        guild: GuildId,
        event_id: ScheduledEventId,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    fn delete_scheduled_event(
        &self,
        guild: GuildId,
        event_id: ScheduledEventId,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Whether the adapter has finished its own startup handshake. The scheduler
    /// (§4.7) does not start any periodic task until this returns `true`.
    fn is_ready(&self) -> bool;
}
