//! Process-wide configuration (§4.9): [`syncd_core::config::CoreConfig`] plus the
//! map engine's filesystem/service settings (§4.6, §8), which have nowhere else to
//! live since [`syncd_map::MapEngineConfig`] is constructed once at startup and
//! handed to whichever out-of-scope command surface renders boards on demand.
//!
//! Grounded in the teacher's `crates/server/src/config.rs` `UnifiedConfig`: one
//! `from_env` that loads `CoreConfig` and layers component-specific env vars on
//! top, rather than every crate parsing its own slice of the environment.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use syncd_core::config::CoreConfig;
use syncd_map::MapEngineConfig;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub core: CoreConfig,
    pub map: MapEngineConfig,
    /// Deadline the scheduler gets to drain in-flight ticks on shutdown (§4.9).
    pub shutdown_deadline_secs: u64,
}

impl EngineConfig {
    const DEFAULT_SHAPEFILE_DIR: &'static str = "data/shapefiles";
    const DEFAULT_CACHE_DIR: &'static str = "data/map-cache";
    const DEFAULT_PROXIMITY_RADIUS_KM: f64 = 25.0;
    const DEFAULT_SHUTDOWN_DEADLINE_SECS: u64 = 10;

    pub fn from_env() -> Result<Self> {
        let core = CoreConfig::from_env()?;

        let map = MapEngineConfig {
            shapefile_dir: env::var("MAP_SHAPEFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_SHAPEFILE_DIR)),
            cache_dir: env::var("MAP_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_CACHE_DIR)),
            geocoder_base_url: env::var("GEOCODER_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            proximity_radius_km: env::var("MAP_PROXIMITY_RADIUS_KM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_PROXIMITY_RADIUS_KM),
        };

        let shutdown_deadline_secs = env::var("SHUTDOWN_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_SHUTDOWN_DEADLINE_SECS);

        Ok(Self {
            core,
            map,
            shutdown_deadline_secs,
        })
    }
}
