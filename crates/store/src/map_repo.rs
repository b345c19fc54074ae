//! Map repo (§4.1): per-guild board configuration and member pins.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syncd_core::models::{MapConfig, MapPin, MapRegion, RegionBounds, RgbColor};
use syncd_core::types::{ChannelId, GuildId, MemberId, MessageId};
use syncd_core::SyncResult;

use crate::error::classify;

#[derive(Clone)]
pub struct MapRepo {
    pool: PgPool,
}

impl MapRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, guild_id: GuildId) -> SyncResult<Option<MapConfig>> {
        sqlx::query_as::<_, MapConfig>(
            r"
            SELECT guild_id, region, custom_bounds, channel_id, message_id,
                   land_color, water_color, country_border_color, state_border_color,
                   river_color, pin_color, pin_size, allow_proximity
            FROM map_configs WHERE guild_id = $1
            ",
        )
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// Create the board with region and default visual settings on first setup.
    pub async fn create(&self, guild_id: GuildId, channel_id: ChannelId) -> SyncResult<MapConfig> {
        sqlx::query_as::<_, MapConfig>(
            r"
            INSERT INTO map_configs (guild_id, channel_id)
            VALUES ($1, $2)
            RETURNING guild_id, region, custom_bounds, channel_id, message_id,
                      land_color, water_color, country_border_color, state_border_color,
                      river_color, pin_color, pin_size, allow_proximity
            ",
        )
        .bind(guild_id)
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn set_message(&self, guild_id: GuildId, message_id: Option<MessageId>) -> SyncResult<()> {
        sqlx::query("UPDATE map_configs SET message_id = $2 WHERE guild_id = $1")
            .bind(guild_id)
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn set_region(
        &self,
        guild_id: GuildId,
        region: MapRegion,
        custom_bounds: Option<&RegionBounds>,
    ) -> SyncResult<()> {
        sqlx::query("UPDATE map_configs SET region = $2, custom_bounds = $3 WHERE guild_id = $1")
            .bind(guild_id)
            .bind(region)
            .bind(custom_bounds.map(sqlx::types::Json))
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn set_visual_settings(
        &self,
        guild_id: GuildId,
        land_color: &RgbColor,
        water_color: &RgbColor,
        country_border_color: &RgbColor,
        state_border_color: &RgbColor,
        river_color: &RgbColor,
        pin_color: &RgbColor,
        pin_size: i32,
        allow_proximity: bool,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            UPDATE map_configs SET
                land_color = $2, water_color = $3, country_border_color = $4,
                state_border_color = $5, river_color = $6, pin_color = $7,
                pin_size = $8, allow_proximity = $9
            WHERE guild_id = $1
            ",
        )
        .bind(guild_id)
        .bind(land_color)
        .bind(water_color)
        .bind(country_border_color)
        .bind(state_border_color)
        .bind(river_color)
        .bind(pin_color)
        .bind(pin_size)
        .bind(allow_proximity)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    pub async fn list_pins(&self, guild_id: GuildId) -> SyncResult<Vec<MapPin>> {
        sqlx::query_as::<_, MapPin>(
            "SELECT guild_id, member_id, latitude, longitude, display_name, color, pinned_at
             FROM map_pins WHERE guild_id = $1",
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn get_pin(&self, guild_id: GuildId, member_id: MemberId) -> SyncResult<Option<MapPin>> {
        sqlx::query_as::<_, MapPin>(
            "SELECT guild_id, member_id, latitude, longitude, display_name, color, pinned_at
             FROM map_pins WHERE guild_id = $1 AND member_id = $2",
        )
        .bind(guild_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// At most one pin per (guild, member) — invariant I4. A repeat pin replaces the
    /// member's prior location rather than adding a second.
    pub async fn set_pin(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        latitude: f64,
        longitude: f64,
        display_name: &str,
        color: &RgbColor,
    ) -> SyncResult<MapPin> {
        sqlx::query_as::<_, MapPin>(
            r"
            INSERT INTO map_pins (guild_id, member_id, latitude, longitude, display_name, color)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (guild_id, member_id) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                display_name = excluded.display_name,
                color = excluded.color,
                pinned_at = now()
            RETURNING guild_id, member_id, latitude, longitude, display_name, color, pinned_at
            ",
        )
        .bind(guild_id)
        .bind(member_id)
        .bind(latitude)
        .bind(longitude)
        .bind(display_name)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    pub async fn delete_pin(&self, guild_id: GuildId, member_id: MemberId) -> SyncResult<()> {
        sqlx::query("DELETE FROM map_pins WHERE guild_id = $1 AND member_id = $2")
            .bind(guild_id)
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn pin_count(&self, guild_id: GuildId) -> SyncResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM map_pins WHERE guild_id = $1")
            .bind(guild_id)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Ok(count)
    }

    /// Pins inside a coarse bounding box around `(lat, lon)`, the candidate set the
    /// map engine narrows with the exact haversine distance before reporting
    /// "nearby member" proximity results. `degree_radius` is a generous pre-filter in
    /// degrees, not kilometers; the caller does the precise distance check.
    pub async fn pins_near(
        &self,
        guild_id: GuildId,
        lat: f64,
        lon: f64,
        degree_radius: f64,
    ) -> SyncResult<Vec<MapPin>> {
        sqlx::query_as::<_, MapPin>(
            r"
            SELECT guild_id, member_id, latitude, longitude, display_name, color, pinned_at
            FROM map_pins
            WHERE guild_id = $1
              AND latitude BETWEEN $2 - $4 AND $2 + $4
              AND longitude BETWEEN $3 - $4 AND $3 + $4
            ",
        )
        .bind(guild_id)
        .bind(lat)
        .bind(lon)
        .bind(degree_radius)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}
