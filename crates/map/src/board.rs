//! The per-guild render-and-post driver (§4.6): resolves region bounds, renders
//! (or fetches from cache) the base and final map images, and keeps the
//! guild's map message in sync, mirroring the calendar engine's own
//! reconcile-then-post shape.

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, RgbImage};
use syncd_adapter::{ChatAdapter, OutboundMessage};
use syncd_core::models::{MapConfig, MapRegion, RegionBounds};
use syncd_core::types::GuildId;
use syncd_core::SyncError;
use syncd_store::Store;

use crate::cache::ImageCache;
use crate::pins::{draw_pin_groups, group_pins};
use crate::regions::{self, Projection};
use crate::render::{render_base_map, Visuals};

/// Filesystem locations and external-service settings the map engine needs
/// beyond what's in the database (§4.6, §8's "image-cache directory" input).
#[derive(Debug, Clone)]
pub struct MapEngineConfig {
    /// Directory holding the Natural Earth `.shp` layers.
    pub shapefile_dir: PathBuf,
    /// Root of the two-level image cache.
    pub cache_dir: PathBuf,
    /// Base URL of the nominatim-like geocoding service.
    pub geocoder_base_url: String,
    /// Default search radius for the proximity query, in kilometers.
    pub proximity_radius_km: f64,
}

/// Render (or reuse) the current board image and push it to the guild's map
/// channel — editing the existing message in place, or sending a new one if
/// none exists yet.
pub async fn render_and_post_board<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    engine: &MapEngineConfig,
    cache: &ImageCache,
    guild_id: GuildId,
) -> Result<(), SyncError> {
    let Some(config) = store.maps.get(guild_id).await? else {
        return Ok(());
    };

    let bounds = resolve_bounds(&config)?;
    let width = MapConfig::BASE_WIDTH_PX;
    let height = regions::height_for_bounds(&bounds, width);
    let visuals = Visuals {
        land_color: config.land_color.clone(),
        water_color: config.water_color.clone(),
        country_border_color: config.country_border_color.clone(),
        state_border_color: config.state_border_color.clone(),
        river_color: config.river_color.clone(),
    };

    let base_png = base_map_png(engine, cache, &config, &bounds, width, height, &visuals).await?;

    let pins = store.maps.list_pins(guild_id).await?;
    let final_key = ImageCache::final_key(config.region, &pins, &visuals);
    let final_png = match cache.get_final(&final_key).await {
        Some(bytes) => bytes,
        None => {
            let base_image = decode_png(&base_png)?;
            let projection = Projection::new(bounds, width, height);
            let pin_size = config.pin_size.max(0) as u32;
            let image = tokio::task::spawn_blocking(move || {
                let mut image = base_image;
                let groups = group_pins(&pins, &projection, pin_size as i32);
                draw_pin_groups(&mut image, &groups, pin_size);
                image
            })
            .await
            .map_err(|e| SyncError::Internal(format!("pin render task panicked: {e}")))?;
            let bytes = encode_png(&image)?;
            cache.put_final(&final_key, &bytes).await?;
            bytes
        }
    };

    post_board_image(store, adapter, &config, final_png).await
}

fn resolve_bounds(config: &MapConfig) -> Result<RegionBounds, SyncError> {
    match config.region {
        MapRegion::Custom => config
            .custom_bounds
            .ok_or_else(|| SyncError::Internal("custom region selected with no bounds configured".into())),
        region => Ok(regions::bounds_for(region).expect("every non-custom MapRegion has fixed bounds")),
    }
}

async fn base_map_png(
    engine: &MapEngineConfig,
    cache: &ImageCache,
    config: &MapConfig,
    bounds: &RegionBounds,
    width: u32,
    height: u32,
    visuals: &Visuals,
) -> Result<Vec<u8>, SyncError> {
    let base_key = ImageCache::base_key(config.region, width, height, visuals);
    if let Some(bytes) = cache.get_base(&base_key).await {
        return Ok(bytes);
    }

    let data_dir = engine.shapefile_dir.clone();
    let region = config.region;
    let bounds = *bounds;
    let visuals = visuals.clone();
    let image = tokio::task::spawn_blocking(move || render_base_map(&data_dir, region, &bounds, width, height, &visuals))
        .await
        .map_err(|e| SyncError::Internal(format!("base render task panicked: {e}")))??;

    let bytes = encode_png(&image)?;
    cache.put_base(&base_key, bytes.clone()).await?;
    Ok(bytes)
}

async fn post_board_image<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    config: &MapConfig,
    png: Vec<u8>,
) -> Result<(), SyncError> {
    let message = || OutboundMessage {
        content: None,
        embeds: Vec::new(),
        attachments: vec![("map.png".to_string(), png.clone())],
    };

    if let Some(message_id) = config.message_id {
        match adapter.edit_message(config.channel_id, message_id, message()).await {
            Ok(()) => return Ok(()),
            Err(SyncError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let new_id = adapter.send_message(config.channel_id, message()).await?;
    store.maps.set_message(config.guild_id, Some(new_id)).await
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, SyncError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| SyncError::Internal(format!("png encode failed: {e}")))?;
    Ok(bytes)
}

fn decode_png(bytes: &[u8]) -> Result<RgbImage, SyncError> {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map(|img| img.to_rgb8())
        .map_err(|e| SyncError::Internal(format!("png decode failed: {e}")))
}
