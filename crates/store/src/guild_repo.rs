//! Guild repo (§4.1): the aggregate root. Every other repo's rows cascade from here.

use sqlx::PgPool;
use syncd_core::models::Guild;
use syncd_core::types::GuildId;
use syncd_core::SyncResult;

use crate::error::classify;

#[derive(Clone)]
pub struct GuildRepo {
    pool: PgPool,
}

impl GuildRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the guild on first observation, or update its display name if it
    /// already exists. Never touches `timezone` (§3: "Created on first observation,
    /// never auto-deleted" — and never silently re-defaulted either).
    pub async fn upsert(&self, id: GuildId, display_name: &str, timezone: &str) -> SyncResult<Guild> {
        sqlx::query_as::<_, Guild>(
            r"
            INSERT INTO guilds (id, display_name, timezone)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name
            RETURNING id, display_name, timezone, created_at
            ",
        )
        .bind(id)
        .bind(display_name)
        .bind(timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn get(&self, id: GuildId) -> SyncResult<Option<Guild>> {
        sqlx::query_as::<_, Guild>(
            "SELECT id, display_name, timezone, created_at FROM guilds WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn list(&self) -> SyncResult<Vec<Guild>> {
        sqlx::query_as::<_, Guild>("SELECT id, display_name, timezone, created_at FROM guilds")
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    pub async fn set_timezone(&self, id: GuildId, timezone: &str) -> SyncResult<()> {
        sqlx::query("UPDATE guilds SET timezone = $2 WHERE id = $1")
            .bind(id)
            .bind(timezone)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}
