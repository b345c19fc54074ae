//! Feed repo (§4.1): feed config, posted-entry dedup ledger, and HTTP conditional cache.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syncd_core::models::{EmbedValue, FeedConfig, FeedHttpCache, PostedEntry};
use syncd_core::types::{ChannelId, FeedId, GuildId, MessageId};
use syncd_core::SyncResult;

use crate::error::classify;

#[derive(Clone)]
pub struct FeedRepo {
    pool: PgPool,
}

impl FeedRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        guild_id: GuildId,
        name: &str,
        source_url: &str,
        channel_id: ChannelId,
        embed_template: &EmbedValue,
    ) -> SyncResult<FeedConfig> {
        sqlx::query_as::<_, FeedConfig>(
            r"
            INSERT INTO feed_configs (id, guild_id, name, source_url, channel_id, embed_template)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, guild_id, name, source_url, channel_id, webhook_username,
                      webhook_avatar_url, accent_color, max_items, crosspost,
                      embed_template, enabled, failure_count, last_success_at
            ",
        )
        .bind(FeedId::new())
        .bind(guild_id)
        .bind(name)
        .bind(source_url)
        .bind(channel_id)
        .bind(sqlx::types::Json(embed_template))
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn get(&self, id: FeedId) -> SyncResult<Option<FeedConfig>> {
        sqlx::query_as::<_, FeedConfig>(
            r"
            SELECT id, guild_id, name, source_url, channel_id, webhook_username,
                   webhook_avatar_url, accent_color, max_items, crosspost,
                   embed_template, enabled, failure_count, last_success_at
            FROM feed_configs WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// All enabled feeds, in no particular order. The scheduler fans out the poll
    /// over this set on every tick.
    pub async fn list_enabled(&self) -> SyncResult<Vec<FeedConfig>> {
        sqlx::query_as::<_, FeedConfig>(
            r"
            SELECT id, guild_id, name, source_url, channel_id, webhook_username,
                   webhook_avatar_url, accent_color, max_items, crosspost,
                   embed_template, enabled, failure_count, last_success_at
            FROM feed_configs WHERE enabled = true
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list_for_guild(&self, guild_id: GuildId) -> SyncResult<Vec<FeedConfig>> {
        sqlx::query_as::<_, FeedConfig>(
            r"
            SELECT id, guild_id, name, source_url, channel_id, webhook_username,
                   webhook_avatar_url, accent_color, max_items, crosspost,
                   embed_template, enabled, failure_count, last_success_at
            FROM feed_configs WHERE guild_id = $1
            ",
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn delete(&self, id: FeedId) -> SyncResult<()> {
        sqlx::query("DELETE FROM feed_configs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn set_enabled(&self, id: FeedId, enabled: bool) -> SyncResult<()> {
        sqlx::query("UPDATE feed_configs SET enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// Bump the failure counter and return the new value, so the caller can compare
    /// against the auto-disable threshold without a second round trip.
    pub async fn increment_failure(&self, id: FeedId) -> SyncResult<i32> {
        let (failure_count,): (i32,) = sqlx::query_as(
            "UPDATE feed_configs SET failure_count = failure_count + 1 WHERE id = $1 RETURNING failure_count",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        Ok(failure_count)
    }

    pub async fn reset_failure(&self, id: FeedId, succeeded_at: DateTime<Utc>) -> SyncResult<()> {
        sqlx::query(
            "UPDATE feed_configs SET failure_count = 0, last_success_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(succeeded_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    pub async fn is_posted(&self, guild_id: GuildId, guid: &str) -> SyncResult<Option<PostedEntry>> {
        sqlx::query_as::<_, PostedEntry>(
            "SELECT guild_id, guid, message_id, channel_id, content_hash, posted_at
             FROM posted_entries WHERE guild_id = $1 AND guid = $2",
        )
        .bind(guild_id)
        .bind(guid)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// Record a posted entry, or overwrite the prior record for the same GUID when an
    /// edited entry is reposted with a new content hash.
    pub async fn mark_posted(
        &self,
        guild_id: GuildId,
        guid: &str,
        message_id: Option<MessageId>,
        channel_id: Option<ChannelId>,
        content_hash: &str,
        posted_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO posted_entries (guild_id, guid, message_id, channel_id, content_hash, posted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (guild_id, guid) DO UPDATE SET
                message_id = excluded.message_id,
                channel_id = excluded.channel_id,
                content_hash = excluded.content_hash,
                posted_at = excluded.posted_at
            ",
        )
        .bind(guild_id)
        .bind(guid)
        .bind(message_id)
        .bind(channel_id)
        .bind(content_hash)
        .bind(posted_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    /// The most recently posted entries for a guild's feed, newest first, bounded to
    /// `limit` rows. Backs the "recent-updates pass" (re-check the newest few entries
    /// even when the feed-level hash hasn't changed).
    pub async fn recent_posted(&self, guild_id: GuildId, limit: i64) -> SyncResult<Vec<PostedEntry>> {
        sqlx::query_as::<_, PostedEntry>(
            r"
            SELECT guild_id, guid, message_id, channel_id, content_hash, posted_at
            FROM posted_entries WHERE guild_id = $1
            ORDER BY posted_at DESC LIMIT $2
            ",
        )
        .bind(guild_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> SyncResult<u64> {
        let result = sqlx::query("DELETE FROM posted_entries WHERE posted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }

    pub async fn get_http_cache(&self, url: &str) -> SyncResult<Option<FeedHttpCache>> {
        sqlx::query_as::<_, FeedHttpCache>(
            "SELECT url, etag, last_modified, content_hash, last_checked_at
             FROM feed_http_cache WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn set_http_cache(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
        content_hash: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO feed_http_cache (url, etag, last_modified, content_hash, last_checked_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO UPDATE SET
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                content_hash = excluded.content_hash,
                last_checked_at = excluded.last_checked_at
            ",
        )
        .bind(url)
        .bind(etag)
        .bind(last_modified)
        .bind(content_hash)
        .bind(checked_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }
}
