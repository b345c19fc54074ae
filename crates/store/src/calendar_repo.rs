//! Calendar repo (§4.1): calendar config, the event-link projection, and reminder dedup.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syncd_core::models::{CalendarConfig, CalendarEventLink, ReminderRecord};
use syncd_core::types::{CalendarConfigId, ChannelId, GuildId, MessageId, RoleId, ScheduledEventId};
use syncd_core::SyncResult;

use crate::error::classify;

#[derive(Clone)]
pub struct CalendarRepo {
    pool: PgPool,
}

impl CalendarRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        guild_id: GuildId,
        calendar_id: &str,
        source_url: &str,
        text_channel_id: ChannelId,
        voice_channel_id: ChannelId,
        week_start: DateTime<Utc>,
    ) -> SyncResult<CalendarConfig> {
        sqlx::query_as::<_, CalendarConfig>(
            r"
            INSERT INTO calendar_configs
                (id, guild_id, calendar_id, source_url, text_channel_id, voice_channel_id, current_week_start)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, guild_id, calendar_id, source_url, text_channel_id, voice_channel_id,
                      whitelist, blacklist, reminder_role_id, last_summary_message_id,
                      current_week_start, last_sync_at
            ",
        )
        .bind(CalendarConfigId::new())
        .bind(guild_id)
        .bind(calendar_id)
        .bind(source_url)
        .bind(text_channel_id)
        .bind(voice_channel_id)
        .bind(week_start)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn get(&self, id: CalendarConfigId) -> SyncResult<Option<CalendarConfig>> {
        sqlx::query_as::<_, CalendarConfig>(
            r"
            SELECT id, guild_id, calendar_id, source_url, text_channel_id, voice_channel_id,
                   whitelist, blacklist, reminder_role_id, last_summary_message_id,
                   current_week_start, last_sync_at
            FROM calendar_configs WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list_all(&self) -> SyncResult<Vec<CalendarConfig>> {
        sqlx::query_as::<_, CalendarConfig>(
            r"
            SELECT id, guild_id, calendar_id, source_url, text_channel_id, voice_channel_id,
                   whitelist, blacklist, reminder_role_id, last_summary_message_id,
                   current_week_start, last_sync_at
            FROM calendar_configs
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list_for_guild(&self, guild_id: GuildId) -> SyncResult<Vec<CalendarConfig>> {
        sqlx::query_as::<_, CalendarConfig>(
            r"
            SELECT id, guild_id, calendar_id, source_url, text_channel_id, voice_channel_id,
                   whitelist, blacklist, reminder_role_id, last_summary_message_id,
                   current_week_start, last_sync_at
            FROM calendar_configs WHERE guild_id = $1
            ",
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn delete(&self, id: CalendarConfigId) -> SyncResult<()> {
        sqlx::query("DELETE FROM calendar_configs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn update_filters(
        &self,
        id: CalendarConfigId,
        whitelist: &[String],
        blacklist: &[String],
    ) -> SyncResult<()> {
        sqlx::query("UPDATE calendar_configs SET whitelist = $2, blacklist = $3 WHERE id = $1")
            .bind(id)
            .bind(whitelist)
            .bind(blacklist)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn set_reminder_role(&self, id: CalendarConfigId, role_id: Option<RoleId>) -> SyncResult<()> {
        sqlx::query("UPDATE calendar_configs SET reminder_role_id = $2 WHERE id = $1")
            .bind(id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// Record the freshly-posted (or edited) weekly summary message and the Monday it
    /// covers, in one write, so the two never drift apart (§4.5 reconciliation).
    pub async fn update_weekly_summary(
        &self,
        id: CalendarConfigId,
        message_id: Option<MessageId>,
        week_start: DateTime<Utc>,
        synced_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            UPDATE calendar_configs
            SET last_summary_message_id = $2, current_week_start = $3, last_sync_at = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(message_id)
        .bind(week_start)
        .bind(synced_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    pub async fn list_event_links(&self, calendar_id: CalendarConfigId) -> SyncResult<Vec<CalendarEventLink>> {
        sqlx::query_as::<_, CalendarEventLink>(
            "SELECT calendar_id, event_title, platform_event_id FROM calendar_event_links WHERE calendar_id = $1",
        )
        .bind(calendar_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn find_event_link_by_platform_id(
        &self,
        platform_event_id: ScheduledEventId,
    ) -> SyncResult<Option<CalendarEventLink>> {
        sqlx::query_as::<_, CalendarEventLink>(
            "SELECT calendar_id, event_title, platform_event_id FROM calendar_event_links WHERE platform_event_id = $1",
        )
        .bind(platform_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn upsert_event_link(
        &self,
        calendar_id: CalendarConfigId,
        event_title: &str,
        platform_event_id: ScheduledEventId,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO calendar_event_links (calendar_id, event_title, platform_event_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (calendar_id, event_title) DO UPDATE SET platform_event_id = excluded.platform_event_id
            ",
        )
        .bind(calendar_id)
        .bind(event_title)
        .bind(platform_event_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    pub async fn delete_event_link(&self, calendar_id: CalendarConfigId, event_title: &str) -> SyncResult<()> {
        sqlx::query("DELETE FROM calendar_event_links WHERE calendar_id = $1 AND event_title = $2")
            .bind(calendar_id)
            .bind(event_title)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn delete_event_link_by_platform_id(&self, platform_event_id: ScheduledEventId) -> SyncResult<()> {
        sqlx::query("DELETE FROM calendar_event_links WHERE platform_event_id = $1")
            .bind(platform_event_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn reminder_already_sent(&self, calendar_id: CalendarConfigId, reminder_key: &str) -> SyncResult<bool> {
        let row: Option<(CalendarConfigId,)> = sqlx::query_as(
            "SELECT calendar_id FROM reminder_records WHERE calendar_id = $1 AND reminder_key = $2",
        )
        .bind(calendar_id)
        .bind(reminder_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        Ok(row.is_some())
    }

    pub async fn mark_reminder_sent(
        &self,
        calendar_id: CalendarConfigId,
        reminder_key: &str,
        sent_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO reminder_records (calendar_id, reminder_key, sent_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (calendar_id, reminder_key) DO NOTHING
            ",
        )
        .bind(calendar_id)
        .bind(reminder_key)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    pub async fn cleanup_reminders_older_than(&self, cutoff: DateTime<Utc>) -> SyncResult<u64> {
        let result = sqlx::query("DELETE FROM reminder_records WHERE sent_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }
}
