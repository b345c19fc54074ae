//! Per-tick guild-timezone resolution.
//!
//! The feed and calendar drivers take a synchronous `Fn(GuildId) -> Tz` (they have
//! no async suspension point of their own for it — see `poll_all_feeds`/
//! `sync_all_calendars`), but timezone is stored per guild in C1. Each driver tick
//! resolves the full guild list once, up front, into a plain map, and hands the
//! drivers a closure over that snapshot rather than threading a database handle
//! through every per-guild call.

use std::collections::HashMap;

use chrono_tz::Tz;
use syncd_core::timezone::{default_timezone, parse_timezone};
use syncd_core::types::GuildId;
use syncd_store::Store;

/// Snapshot of every known guild's timezone, refreshed once per driver tick.
pub struct GuildTzMap {
    zones: HashMap<GuildId, Tz>,
}

impl GuildTzMap {
    pub async fn load(store: &Store) -> Self {
        let mut zones = HashMap::new();
        match store.guilds.list().await {
            Ok(guilds) => {
                for guild in guilds {
                    let tz = parse_timezone(&guild.timezone).unwrap_or_else(|_| default_timezone());
                    zones.insert(guild.id, tz);
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load guild list for timezone resolution; falling back to default for every guild this tick");
            }
        }
        Self { zones }
    }

    /// Looked up by value, never by reference, so this can be passed directly as
    /// the `guild_tz: impl Fn(GuildId) -> Tz` the feed/calendar drivers expect.
    #[must_use]
    pub fn resolve(&self, guild_id: GuildId) -> Tz {
        self.zones.get(&guild_id).copied().unwrap_or_else(default_timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_default_for_unknown_guild() {
        let map = GuildTzMap { zones: HashMap::new() };
        assert_eq!(map.resolve(GuildId::new(1)), default_timezone());
    }

    #[test]
    fn resolve_returns_the_stored_zone() {
        let guild_id = GuildId::new(42);
        let tz = parse_timezone("Asia/Singapore").unwrap();
        let mut zones = HashMap::new();
        zones.insert(guild_id, tz);
        let map = GuildTzMap { zones };
        assert_eq!(map.resolve(guild_id), tz);
        assert_eq!(map.resolve(GuildId::new(43)), default_timezone());
    }
}
