//! Moderation/monitor repo (§4.1): audit webhook config, self-refreshing monitor
//! messages, and the rebuildable per-channel webhook URL cache.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syncd_core::models::{ModerationConfig, MonitorMessage, MonitorType};
use syncd_core::types::{ChannelId, GuildId, MessageId, RoleId};
use syncd_core::SyncResult;

use crate::error::classify;

#[derive(Clone)]
pub struct ModerationRepo {
    pool: PgPool,
}

impl ModerationRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, guild_id: GuildId) -> SyncResult<Option<ModerationConfig>> {
        sqlx::query_as::<_, ModerationConfig>(
            "SELECT guild_id, member_log_webhook_url, auto_join_role_id FROM moderation_configs WHERE guild_id = $1",
        )
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn upsert(
        &self,
        guild_id: GuildId,
        member_log_webhook_url: Option<&str>,
        auto_join_role_id: Option<RoleId>,
    ) -> SyncResult<ModerationConfig> {
        sqlx::query_as::<_, ModerationConfig>(
            r"
            INSERT INTO moderation_configs (guild_id, member_log_webhook_url, auto_join_role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id) DO UPDATE SET
                member_log_webhook_url = excluded.member_log_webhook_url,
                auto_join_role_id = excluded.auto_join_role_id
            RETURNING guild_id, member_log_webhook_url, auto_join_role_id
            ",
        )
        .bind(guild_id)
        .bind(member_log_webhook_url)
        .bind(auto_join_role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn get_monitor(&self, channel_id: ChannelId, monitor_type: MonitorType) -> SyncResult<Option<MonitorMessage>> {
        sqlx::query_as::<_, MonitorMessage>(
            "SELECT channel_id, monitor_type, message_id, last_update_at, refresh_interval_secs
             FROM monitor_messages WHERE channel_id = $1 AND monitor_type = $2",
        )
        .bind(channel_id)
        .bind(monitor_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list_due_monitors(&self, now: DateTime<Utc>) -> SyncResult<Vec<MonitorMessage>> {
        sqlx::query_as::<_, MonitorMessage>(
            r"
            SELECT channel_id, monitor_type, message_id, last_update_at, refresh_interval_secs
            FROM monitor_messages
            WHERE last_update_at + (refresh_interval_secs || ' seconds')::interval <= $1
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn upsert_monitor(
        &self,
        channel_id: ChannelId,
        monitor_type: MonitorType,
        message_id: MessageId,
        updated_at: DateTime<Utc>,
        refresh_interval_secs: i32,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO monitor_messages (channel_id, monitor_type, message_id, last_update_at, refresh_interval_secs)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (channel_id, monitor_type) DO UPDATE SET
                message_id = excluded.message_id,
                last_update_at = excluded.last_update_at,
                refresh_interval_secs = excluded.refresh_interval_secs
            ",
        )
        .bind(channel_id)
        .bind(monitor_type)
        .bind(message_id)
        .bind(updated_at)
        .bind(refresh_interval_secs)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    pub async fn get_webhook(&self, channel_id: ChannelId) -> SyncResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT webhook_url FROM webhook_cache WHERE channel_id = $1")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;
        Ok(row.map(|(url,)| url))
    }

    pub async fn set_webhook(&self, channel_id: ChannelId, webhook_url: &str, cached_at: DateTime<Utc>) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO webhook_cache (channel_id, webhook_url, cached_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (channel_id) DO UPDATE SET webhook_url = excluded.webhook_url, cached_at = excluded.cached_at
            ",
        )
        .bind(channel_id)
        .bind(webhook_url)
        .bind(cached_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }
}
