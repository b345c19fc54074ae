//! Core domain models for the sync engine.
//!
//! These models represent the core business entities and map to database tables
//! owned by the persistent store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CalendarConfigId, ChannelId, FeedId, GuildId, MemberId, MessageId, RoleId, ScheduledEventId,
};

/// A tenant. The aggregate root: deleting a guild cascades to every row below that
/// references it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Guild {
    pub id: GuildId,
    pub display_name: String,
    /// IANA timezone name, e.g. "Europe/Berlin".
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl Guild {
    pub const DEFAULT_TIMEZONE: &'static str = "Europe/Berlin";
}

/// Posting identity and embed rendering configuration for one RSS/Atom feed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedConfig {
    pub id: FeedId,
    pub guild_id: GuildId,
    pub name: String,
    pub source_url: String,
    pub channel_id: ChannelId,
    pub webhook_username: Option<String>,
    pub webhook_avatar_url: Option<String>,
    pub accent_color: Option<i32>,
    pub max_items: i32,
    pub crosspost: bool,
    #[sqlx(json)]
    pub embed_template: EmbedValue,
    pub enabled: bool,
    pub failure_count: i32,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl FeedConfig {
    pub const DEFAULT_MAX_ITEMS: i32 = 3;
}

/// A typed tree of template values. Every string leaf may contain `{placeholder}`
/// tokens resolved by a safe map-lookup formatter; unknown placeholders resolve to
/// the empty string rather than an error. Replaces the source's `dict.format_map`
/// dynamic templating with a closed, serializable variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbedValue {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<EmbedValue>),
    Map(std::collections::BTreeMap<String, EmbedValue>),
    Null,
}

/// Record of one posted (or edited) feed entry, keyed by (guild, GUID). Garbage
/// collected after 7 days per `PostedEntry` retention.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostedEntry {
    pub guild_id: GuildId,
    pub guid: String,
    pub message_id: Option<MessageId>,
    pub channel_id: Option<ChannelId>,
    pub content_hash: String,
    pub posted_at: DateTime<Utc>,
}

impl PostedEntry {
    pub const RETENTION_DAYS: i64 = 7;
}

/// Conditional-request HTTP cache for a feed URL. Purely an optimization: absence or
/// corruption never changes output, only extra work (invariant I6).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedHttpCache {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_hash: Option<String>,
    pub last_checked_at: DateTime<Utc>,
}

/// Per-calendar configuration: source iCal feed, destination channels, filters, and
/// weekly-summary bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CalendarConfig {
    pub id: CalendarConfigId,
    pub guild_id: GuildId,
    /// The external calendar identifier used in the `unique(guild, calendar_id)` key;
    /// distinct from `id`, which is this row's own primary key.
    pub calendar_id: String,
    pub source_url: String,
    pub text_channel_id: ChannelId,
    pub voice_channel_id: ChannelId,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub reminder_role_id: Option<RoleId>,
    pub last_summary_message_id: Option<MessageId>,
    pub current_week_start: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// The materialized projection of "platform scheduled events this calendar owns",
/// keyed by event title. Reverse lookup (`platform_event_id` -> title) must stay
/// consistent per invariant I2.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CalendarEventLink {
    pub calendar_id: CalendarConfigId,
    pub event_title: String,
    pub platform_event_id: ScheduledEventId,
}

/// Dedup record for one-hour-ahead reminders. `reminder_key` is
/// `{calendar_id}|{event_title}|{event_start_iso}`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReminderRecord {
    pub calendar_id: CalendarConfigId,
    pub reminder_key: String,
    pub sent_at: DateTime<Utc>,
}

impl ReminderRecord {
    pub const RETENTION_DAYS: i64 = 7;

    #[must_use]
    pub fn key(calendar_id: CalendarConfigId, event_title: &str, event_start: DateTime<Utc>) -> String {
        format!("{calendar_id}|{event_title}|{}", event_start.to_rfc3339())
    }
}

/// A predefined geographic bounding box, or a guild-supplied custom region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "map_region", rename_all = "lowercase")]
pub enum MapRegion {
    World,
    Europe,
    Germany,
    UnitedStates,
    Custom,
}

/// Visual configuration for one guild's map board.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MapConfig {
    pub guild_id: GuildId,
    pub region: MapRegion,
    #[sqlx(json)]
    pub custom_bounds: Option<RegionBounds>,
    pub channel_id: ChannelId,
    pub message_id: Option<MessageId>,
    pub land_color: RgbColor,
    pub water_color: RgbColor,
    pub country_border_color: RgbColor,
    pub state_border_color: RgbColor,
    pub river_color: RgbColor,
    pub pin_color: RgbColor,
    pub pin_size: i32,
    pub allow_proximity: bool,
}

impl MapConfig {
    pub const DEFAULT_PIN_SIZE: i32 = 16;
    pub const MIN_PIN_SIZE: i32 = 8;
    pub const MAX_PIN_SIZE: i32 = 32;
    pub const BASE_WIDTH_PX: u32 = 1500;

    #[must_use]
    pub fn default_land_color() -> RgbColor {
        RgbColor::from_rgb(0xe0, 0xe0, 0xe0)
    }

    #[must_use]
    pub fn default_water_color() -> RgbColor {
        RgbColor::from_rgb(0xa0, 0xc8, 0xf0)
    }

    #[must_use]
    pub fn default_country_border_color() -> RgbColor {
        RgbColor::from_rgb(0x60, 0x60, 0x60)
    }

    #[must_use]
    pub fn default_state_border_color() -> RgbColor {
        RgbColor::from_rgb(0xa0, 0xa0, 0xa0)
    }

    #[must_use]
    pub fn default_river_color() -> RgbColor {
        RgbColor::from_rgb(0xa0, 0xc8, 0xf0)
    }

    #[must_use]
    pub fn default_pin_color() -> RgbColor {
        RgbColor::from_rgb(0xe7, 0x4c, 0x3c)
    }
}

/// WGS84 bounding box, used both for predefined regions and custom guild regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// An RGB color, stored as a `#rrggbb` hex string (Postgres has no fixed-width byte
/// array type, and hex is what the source's `_ensure_color_string` already produced
/// for display, so we keep that as the wire and storage format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct RgbColor(String);

impl RgbColor {
    #[must_use]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{r:02x}{g:02x}{b:02x}"))
    }

    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn to_rgb(&self) -> Option<[u8; 3]> {
        let hex = self.0.strip_prefix('#').unwrap_or(&self.0);
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some([r, g, b])
    }
}

impl std::fmt::Display for RgbColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RgbColor {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let candidate = Self(s.to_string());
        if candidate.to_rgb().is_some() {
            Ok(candidate)
        } else {
            Err(crate::error::SyncError::PermanentSource(format!(
                "invalid color {s}"
            )))
        }
    }
}

impl Serialize for RgbColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single user's pin on the guild map. At most one row per (guild, member) —
/// invariant I4.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MapPin {
    pub guild_id: GuildId,
    pub member_id: MemberId,
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub color: RgbColor,
    pub pinned_at: DateTime<Utc>,
}

/// Per-guild moderation/audit webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModerationConfig {
    pub guild_id: GuildId,
    pub member_log_webhook_url: Option<String>,
    pub auto_join_role_id: Option<RoleId>,
}

/// One self-refreshing status message, unique per (channel, monitor type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "monitor_type", rename_all = "lowercase")]
pub enum MonitorType {
    System,
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonitorMessage {
    pub channel_id: ChannelId,
    pub monitor_type: MonitorType,
    pub message_id: MessageId,
    pub last_update_at: DateTime<Utc>,
    pub refresh_interval_secs: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rgb_color_roundtrips_through_hex() {
        let color = RgbColor::from_rgb(0xe7, 0x4c, 0x3c);
        assert_eq!(color.as_hex(), "#e74c3c");
        assert_eq!(color.to_rgb(), Some([0xe7, 0x4c, 0x3c]));
    }

    #[test]
    fn rgb_color_parses_from_str() {
        let color: RgbColor = "#00ff00".parse().unwrap();
        assert_eq!(color.to_rgb(), Some([0, 0xff, 0]));
    }

    #[test]
    fn rgb_color_rejects_malformed_hex() {
        assert!("not-a-color".parse::<RgbColor>().is_err());
        assert!("#fff".parse::<RgbColor>().is_err());
    }

    #[test]
    fn rgb_color_serializes_as_bare_string() {
        let color = RgbColor::from_rgb(1, 2, 3);
        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"#010203\"");
    }

    #[test]
    fn reminder_key_matches_documented_format() {
        let calendar_id = CalendarConfigId::new();
        let start = Utc.with_ymd_and_hms(2026, 3, 5, 18, 0, 0).unwrap();
        let key = ReminderRecord::key(calendar_id, "Board Game Night", start);
        assert!(key.starts_with(&format!("{calendar_id}|Board Game Night|")));
    }

    #[test]
    fn map_config_defaults_are_valid_colors() {
        assert!(MapConfig::default_land_color().to_rgb().is_some());
        assert!(MapConfig::default_pin_color().to_rgb().is_some());
    }
}
