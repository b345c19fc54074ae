//! Two-level image cache (§4.6): base maps (no pins) get an in-memory tier plus
//! on-disk persistence; final maps (with pins) are on-disk only.
//!
//! Grounded in `original_source/core/map_gen.py`'s own base/final cache split,
//! replacing its filesystem-dict bookkeeping with `moka` for the hot tier.

use std::path::{Path, PathBuf};

use moka::future::Cache;
use sha2::{Digest, Sha256};
use syncd_core::models::{MapPin, MapRegion};
use syncd_core::SyncError;

use crate::render::Visuals;

/// Base maps rarely churn (only on a visual-settings change), so a modest
/// in-memory entry cap is plenty; everything also lands on disk regardless.
const BASE_MEMORY_CAPACITY: u64 = 64;

pub struct ImageCache {
    base_memory: Cache<String, Vec<u8>>,
    base_dir: PathBuf,
    final_dir: PathBuf,
}

impl ImageCache {
    #[must_use]
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            base_memory: Cache::new(BASE_MEMORY_CAPACITY),
            base_dir: cache_dir.join("base"),
            final_dir: cache_dir.join("final"),
        }
    }

    /// `(region, width, height, visual-settings-hash)` — invalidated only when
    /// visual settings change (§4.6, invariant P10).
    #[must_use]
    pub fn base_key(region: MapRegion, width: u32, height: u32, visuals: &Visuals) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{region:?}|{width}|{height}"));
        hash_visuals(&mut hasher, visuals);
        hex::encode(hasher.finalize())
    }

    /// `(region, pin-set-hash, visual-settings-hash)` — invalidated whenever the
    /// pin set changes; independent of the base cache (§4.6).
    #[must_use]
    pub fn final_key(region: MapRegion, pins: &[MapPin], visuals: &Visuals) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{region:?}"));
        let mut sorted: Vec<_> = pins.iter().collect();
        sorted.sort_by_key(|p| p.member_id.0);
        for pin in sorted {
            hasher.update(format!(
                "|{}:{:.6}:{:.6}:{}",
                pin.member_id,
                pin.latitude,
                pin.longitude,
                pin.color.as_hex()
            ));
        }
        hash_visuals(&mut hasher, visuals);
        hex::encode(hasher.finalize())
    }

    pub async fn get_base(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(bytes) = self.base_memory.get(key).await {
            return Some(bytes);
        }
        let path = self.base_dir.join(format!("{key}.png"));
        let bytes = tokio::fs::read(&path).await.ok()?;
        self.base_memory.insert(key.to_string(), bytes.clone()).await;
        Some(bytes)
    }

    pub async fn put_base(&self, key: &str, bytes: Vec<u8>) -> Result<(), SyncError> {
        write_atomic(&self.base_dir, key, &bytes).await?;
        self.base_memory.insert(key.to_string(), bytes).await;
        Ok(())
    }

    pub async fn get_final(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.final_dir.join(format!("{key}.png"));
        tokio::fs::read(&path).await.ok()
    }

    pub async fn put_final(&self, key: &str, bytes: &[u8]) -> Result<(), SyncError> {
        write_atomic(&self.final_dir, key, bytes).await
    }
}

fn hash_visuals(hasher: &mut Sha256, visuals: &Visuals) {
    hasher.update(visuals.land_color.as_hex());
    hasher.update(visuals.water_color.as_hex());
    hasher.update(visuals.country_border_color.as_hex());
    hasher.update(visuals.state_border_color.as_hex());
    hasher.update(visuals.river_color.as_hex());
}

async fn write_atomic(dir: &Path, key: &str, bytes: &[u8]) -> Result<(), SyncError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SyncError::Internal(format!("image cache dir create failed: {e}")))?;
    let tmp = dir.join(format!("{key}.png.tmp"));
    let dest = dir.join(format!("{key}.png"));
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| SyncError::Internal(format!("image cache write failed: {e}")))?;
    tokio::fs::rename(&tmp, &dest)
        .await
        .map_err(|e| SyncError::Internal(format!("image cache rename failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncd_core::models::RgbColor;
    use syncd_core::types::{GuildId, MemberId};

    fn visuals() -> Visuals {
        Visuals {
            land_color: RgbColor::from_rgb(1, 2, 3),
            water_color: RgbColor::from_rgb(4, 5, 6),
            country_border_color: RgbColor::from_rgb(7, 8, 9),
            state_border_color: RgbColor::from_rgb(10, 11, 12),
            river_color: RgbColor::from_rgb(13, 14, 15),
        }
    }

    #[test]
    fn base_key_ignores_pins() {
        let visuals = visuals();
        let key = ImageCache::base_key(MapRegion::Germany, 1500, 1800, &visuals);
        assert_eq!(key, ImageCache::base_key(MapRegion::Germany, 1500, 1800, &visuals));
    }

    #[test]
    fn base_key_changes_with_visuals() {
        let mut other = visuals();
        other.land_color = RgbColor::from_rgb(255, 255, 255);
        assert_ne!(
            ImageCache::base_key(MapRegion::Germany, 1500, 1800, &visuals()),
            ImageCache::base_key(MapRegion::Germany, 1500, 1800, &other)
        );
    }

    #[test]
    fn final_key_changes_with_pin_set() {
        let visuals = visuals();
        let empty = ImageCache::final_key(MapRegion::Germany, &[], &visuals);
        let pin = MapPin {
            guild_id: GuildId::new(1),
            member_id: MemberId::new(1),
            latitude: 50.0,
            longitude: 10.0,
            display_name: "x".into(),
            color: RgbColor::from_rgb(1, 1, 1),
            pinned_at: chrono::Utc::now(),
        };
        let with_pin = ImageCache::final_key(MapRegion::Germany, std::slice::from_ref(&pin), &visuals);
        assert_ne!(empty, with_pin);
    }

    #[test]
    fn final_key_is_order_independent() {
        let visuals = visuals();
        let a = MapPin {
            guild_id: GuildId::new(1),
            member_id: MemberId::new(1),
            latitude: 50.0,
            longitude: 10.0,
            display_name: "a".into(),
            color: RgbColor::from_rgb(1, 1, 1),
            pinned_at: chrono::Utc::now(),
        };
        let b = MapPin { member_id: MemberId::new(2), ..a.clone() };
        let forward = ImageCache::final_key(MapRegion::Germany, &[a.clone(), b.clone()], &visuals);
        let reversed = ImageCache::final_key(MapRegion::Germany, &[b, a], &visuals);
        assert_eq!(forward, reversed);
    }
}
