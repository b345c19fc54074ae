//! Predefined region bounding boxes and Web-Mercator aspect-ratio math (§4.6).

use syncd_core::models::{MapRegion, RegionBounds};

/// Base width (px) every rendered map uses before height is derived from the
/// region's aspect ratio (§4.6, `MapConfig::BASE_WIDTH_PX`).
pub use syncd_core::models::MapConfig;

/// Bounds for the five predefined regions, carried over from
/// `original_source/core/map_config.py::MAP_REGIONS`. `MapRegion::Custom` has
/// no fixed bounds here — the guild's own `RegionBounds` is used instead.
#[must_use]
pub fn bounds_for(region: MapRegion) -> Option<RegionBounds> {
    match region {
        MapRegion::World => Some(RegionBounds { lat_min: -65.0, lat_max: 85.0, lon_min: -180.0, lon_max: 180.0 }),
        MapRegion::Europe => Some(RegionBounds { lat_min: 34.5, lat_max: 73.0, lon_min: -25.0, lon_max: 40.0 }),
        MapRegion::Germany => Some(RegionBounds { lat_min: 47.2701, lat_max: 55.0583, lon_min: 5.8663, lon_max: 15.0419 }),
        MapRegion::UnitedStates => Some(RegionBounds { lat_min: 24.0, lat_max: 51.0, lon_min: -126.0, lon_max: -66.0 }),
        MapRegion::Custom => None,
    }
}

/// Height in px for `bounds` rendered at `width`, using the Web-Mercator
/// projection's latitude distortion so the result looks undistorted on screen
/// (§4.6's height formula).
#[must_use]
pub fn height_for_bounds(bounds: &RegionBounds, width: u32) -> u32 {
    let lat_range_px = mercator_y(bounds.lat_max) - mercator_y(bounds.lat_min);
    let lon_range_rad = (bounds.lon_max - bounds.lon_min).to_radians();
    let aspect_ratio = lat_range_px / lon_range_rad;
    (f64::from(width) * aspect_ratio).round().max(1.0) as u32
}

fn mercator_y(lat: f64) -> f64 {
    ((90.0 + lat) * std::f64::consts::PI / 360.0).tan().ln()
}

/// A pixel coordinate within a rendered map image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub x: i64,
    pub y: i64,
}

/// Equirectangular (plate carrée) lat/lon → pixel projection, matching the
/// source's own `to_px` closure: linear in both axes over the bounding box,
/// not full Web-Mercator — only the *aspect ratio* (height) uses Mercator math.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    bounds: RegionBounds,
    width: u32,
    height: u32,
}

impl Projection {
    #[must_use]
    pub const fn new(bounds: RegionBounds, width: u32, height: u32) -> Self {
        Self { bounds, width, height }
    }

    #[must_use]
    pub fn project(&self, lat: f64, lon: f64) -> Pixel {
        let lon_range = self.bounds.lon_max - self.bounds.lon_min;
        let lat_range = self.bounds.lat_max - self.bounds.lat_min;
        let x = (lon - self.bounds.lon_min) / lon_range * f64::from(self.width);
        let y = (self.bounds.lat_max - lat) / lat_range * f64::from(self.height);
        Pixel { x: x.round() as i64, y: y.round() as i64 }
    }

    #[must_use]
    pub const fn in_bounds(&self, lat: f64, lon: f64) -> bool {
        lat >= self.bounds.lat_min && lat <= self.bounds.lat_max && lon >= self.bounds.lon_min && lon <= self.bounds.lon_max
    }
}

/// Geographic-area scale factor relative to Germany (factor 1.0), used to scale
/// line widths so larger regions don't get visually overwhelming borders
/// (§4.6: `1 + log10(area_ratio)*0.5`, clamped to `[0.3, 8.0]`).
#[must_use]
pub fn geographic_scale_factor(bounds: &RegionBounds) -> f64 {
    let germany = bounds_for(MapRegion::Germany).expect("germany bounds are always defined");
    let area_ratio = area(bounds) / area(&germany);

    let scale = if area_ratio > 1.0 {
        1.0 + area_ratio.log10() * 0.5
    } else {
        area_ratio
    };
    scale.clamp(0.3, 8.0)
}

fn area(bounds: &RegionBounds) -> f64 {
    let lat_range = bounds.lat_max - bounds.lat_min;
    let center_lat = (bounds.lat_min + bounds.lat_max) / 2.0;
    let lon_range_corrected = (bounds.lon_max - bounds.lon_min) * center_lat.to_radians().cos();
    lat_range * lon_range_corrected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn germany_scale_factor_is_one() {
        let bounds = bounds_for(MapRegion::Germany).unwrap();
        assert!((geographic_scale_factor(&bounds) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn world_scale_factor_is_larger_than_germany() {
        let world = bounds_for(MapRegion::World).unwrap();
        assert!(geographic_scale_factor(&world) > 1.0);
    }

    #[test]
    fn projection_maps_corners_to_image_edges() {
        let bounds = bounds_for(MapRegion::Germany).unwrap();
        let projection = Projection::new(bounds, 1000, 1200);
        let top_left = projection.project(bounds.lat_max, bounds.lon_min);
        assert_eq!(top_left, Pixel { x: 0, y: 0 });
        let bottom_right = projection.project(bounds.lat_min, bounds.lon_max);
        assert_eq!(bottom_right, Pixel { x: 1000, y: 1200 });
    }

    #[test]
    fn height_for_bounds_is_positive() {
        let bounds = bounds_for(MapRegion::World).unwrap();
        assert!(height_for_bounds(&bounds, MapConfig::BASE_WIDTH_PX) > 0);
    }
}
