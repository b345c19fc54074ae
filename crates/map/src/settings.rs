//! Visual-settings validation at the config-update boundary (§4.6).
//!
//! A malformed color or an out-of-range pin size is rejected outright rather
//! than silently clamped; the engine falls back to `MapConfig`'s per-field
//! default instead of leaving a prior render partially applied.

use std::str::FromStr;

use syncd_core::models::{MapConfig, RgbColor};
use syncd_core::SyncError;

/// A guild's requested visual-settings update, each field optional so a
/// partial update (e.g. "just change the pin size") only touches what was
/// supplied.
#[derive(Debug, Clone, Default)]
pub struct VisualSettingsUpdate {
    pub land_color: Option<String>,
    pub water_color: Option<String>,
    pub country_border_color: Option<String>,
    pub state_border_color: Option<String>,
    pub river_color: Option<String>,
    pub pin_color: Option<String>,
    pub pin_size: Option<i32>,
    pub allow_proximity: Option<bool>,
}

/// The fully resolved settings to persist: every field present, invalid inputs
/// replaced by the matching `MapConfig` default.
#[derive(Debug, Clone)]
pub struct ResolvedVisualSettings {
    pub land_color: RgbColor,
    pub water_color: RgbColor,
    pub country_border_color: RgbColor,
    pub state_border_color: RgbColor,
    pub river_color: RgbColor,
    pub pin_color: RgbColor,
    pub pin_size: i32,
    pub allow_proximity: bool,
}

/// Validate `update` against `current`, rejecting malformed input with
/// `SyncError::PermanentSource` rather than clamping it.
pub fn validate(update: &VisualSettingsUpdate, current: &MapConfig) -> Result<ResolvedVisualSettings, SyncError> {
    Ok(ResolvedVisualSettings {
        land_color: resolve_color(update.land_color.as_deref(), &current.land_color)?,
        water_color: resolve_color(update.water_color.as_deref(), &current.water_color)?,
        country_border_color: resolve_color(update.country_border_color.as_deref(), &current.country_border_color)?,
        state_border_color: resolve_color(update.state_border_color.as_deref(), &current.state_border_color)?,
        river_color: resolve_color(update.river_color.as_deref(), &current.river_color)?,
        pin_color: resolve_color(update.pin_color.as_deref(), &current.pin_color)?,
        pin_size: resolve_pin_size(update.pin_size, current.pin_size)?,
        allow_proximity: update.allow_proximity.unwrap_or(current.allow_proximity),
    })
}

fn resolve_color(requested: Option<&str>, current: &RgbColor) -> Result<RgbColor, SyncError> {
    match requested {
        None => Ok(current.clone()),
        Some(hex) => RgbColor::from_str(hex),
    }
}

fn resolve_pin_size(requested: Option<i32>, current: i32) -> Result<i32, SyncError> {
    match requested {
        None => Ok(current),
        Some(size) if (MapConfig::MIN_PIN_SIZE..=MapConfig::MAX_PIN_SIZE).contains(&size) => Ok(size),
        Some(size) => Err(SyncError::PermanentSource(format!(
            "pin size {size} outside [{}, {}]",
            MapConfig::MIN_PIN_SIZE,
            MapConfig::MAX_PIN_SIZE
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncd_core::models::MapRegion;
    use syncd_core::types::{ChannelId, GuildId};

    fn default_config() -> MapConfig {
        MapConfig {
            guild_id: GuildId::new(1),
            region: MapRegion::Germany,
            custom_bounds: None,
            channel_id: ChannelId::new(1),
            message_id: None,
            land_color: MapConfig::default_land_color(),
            water_color: MapConfig::default_water_color(),
            country_border_color: MapConfig::default_country_border_color(),
            state_border_color: MapConfig::default_state_border_color(),
            river_color: MapConfig::default_river_color(),
            pin_color: MapConfig::default_pin_color(),
            pin_size: MapConfig::DEFAULT_PIN_SIZE,
            allow_proximity: false,
        }
    }

    #[test]
    fn unset_fields_keep_current_values() {
        let config = default_config();
        let resolved = validate(&VisualSettingsUpdate::default(), &config).unwrap();
        assert_eq!(resolved.land_color, config.land_color);
        assert_eq!(resolved.pin_size, config.pin_size);
    }

    #[test]
    fn malformed_color_is_rejected_not_clamped() {
        let config = default_config();
        let update = VisualSettingsUpdate { land_color: Some("not-a-color".into()), ..Default::default() };
        assert!(validate(&update, &config).is_err());
    }

    #[test]
    fn pin_size_out_of_range_is_rejected() {
        let config = default_config();
        let update = VisualSettingsUpdate { pin_size: Some(100), ..Default::default() };
        assert!(validate(&update, &config).is_err());
    }

    #[test]
    fn valid_update_applies() {
        let config = default_config();
        let update = VisualSettingsUpdate { pin_size: Some(20), land_color: Some("#00ff00".into()), ..Default::default() };
        let resolved = validate(&update, &config).unwrap();
        assert_eq!(resolved.pin_size, 20);
        assert_eq!(resolved.land_color.as_hex(), "#00ff00");
    }
}
