//! Proximity queries: haversine distance and a cropped radius-circle render
//! (§4.6 "Proximity query").
//!
//! Grounded in `original_source/core/map_gen.py::calculate_distance`.

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use syncd_core::models::MapPin;
use syncd_core::types::MemberId;

use crate::regions::Projection;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points, in kilometers.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// One other pin within `radius_km` of the queried member, sorted nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyMember {
    pub member_id: MemberId,
    pub display_name: String,
    pub distance_km: f64,
}

/// Find every pin (other than `self_pin`) within `radius_km`, sorted by distance.
/// Callers obtain `candidates` from `MapRepo::pins_near`'s coarse bounding-box
/// pre-filter; this function applies the exact distance check.
#[must_use]
pub fn find_nearby(self_pin: &MapPin, candidates: &[MapPin], radius_km: f64) -> Vec<NearbyMember> {
    let mut nearby: Vec<_> = candidates
        .iter()
        .filter(|p| p.member_id != self_pin.member_id)
        .filter_map(|p| {
            let distance = haversine_km(self_pin.latitude, self_pin.longitude, p.latitude, p.longitude);
            (distance <= radius_km).then_some(NearbyMember {
                member_id: p.member_id,
                display_name: p.display_name.clone(),
                distance_km: distance,
            })
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// Crop `final_map` to a square window centered on `self_pin`'s projected
/// position, draw a red radius circle and a green self-pin, and return the
/// resulting image. `radius_km` is converted to pixels using the projection's
/// own scale at the self-pin's latitude.
#[must_use]
pub fn render_proximity_crop(
    final_map: &RgbImage,
    projection: &Projection,
    self_pin: &MapPin,
    radius_km: f64,
    crop_half_extent_px: u32,
) -> RgbImage {
    let center = projection.project(self_pin.latitude, self_pin.longitude);
    let radius_px = km_to_px(projection, self_pin.latitude, radius_km);

    let half = i64::from(crop_half_extent_px);
    let x0 = (center.x - half).max(0) as u32;
    let y0 = (center.y - half).max(0) as u32;
    let crop_width = (2 * crop_half_extent_px).min(final_map.width().saturating_sub(x0));
    let crop_height = (2 * crop_half_extent_px).min(final_map.height().saturating_sub(y0));

    let mut cropped = imageops::crop_imm(final_map, x0, y0, crop_width.max(1), crop_height.max(1)).to_image();

    let local_center = (
        (center.x - i64::from(x0)) as i32,
        (center.y - i64::from(y0)) as i32,
    );
    draw_hollow_circle_mut(&mut cropped, local_center, radius_px as i32, Rgb([0xE7, 0x1C, 0x1C]));
    draw_hollow_circle_mut(&mut cropped, local_center, 6, Rgb([0x2E, 0xCC, 0x71]));

    cropped
}

fn km_to_px(projection: &Projection, at_latitude: f64, radius_km: f64) -> f64 {
    let one_degree_lon_km = 111.32 * at_latitude.to_radians().cos();
    let radius_deg_lon = radius_km / one_degree_lon_km.max(0.000_1);
    let a = projection.project(at_latitude, 0.0);
    let b = projection.project(at_latitude, radius_deg_lon);
    ((b.x - a.x).abs()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use syncd_core::models::{RegionBounds, RgbColor};
    use syncd_core::types::GuildId;

    fn pin(member: u64, lat: f64, lon: f64, name: &str) -> MapPin {
        MapPin {
            guild_id: GuildId::new(1),
            member_id: MemberId::new(member),
            latitude: lat,
            longitude: lon,
            display_name: name.to_string(),
            color: RgbColor::from_rgb(0, 0, 0),
            pinned_at: Utc::now(),
        }
    }

    #[test]
    fn haversine_is_zero_for_identical_points() {
        assert!(haversine_km(50.0, 10.0, 50.0, 10.0) < 1e-9);
    }

    #[test]
    fn haversine_berlin_to_munich_is_roughly_right() {
        // Berlin (52.52, 13.405) to Munich (48.1351, 11.5820) is ~505 km.
        let distance = haversine_km(52.52, 13.405, 48.1351, 11.5820);
        assert!((distance - 505.0).abs() < 15.0, "got {distance}");
    }

    #[test]
    fn find_nearby_excludes_self_and_sorts_by_distance() {
        let me = pin(1, 52.52, 13.405, "me");
        let far = pin(2, 48.1351, 11.5820, "far");
        let near = pin(3, 52.53, 13.41, "near");
        let nearby = find_nearby(&me, &[me.clone(), far, near.clone()], 50.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].member_id, near.member_id);
    }

    #[test]
    fn find_nearby_respects_radius() {
        let me = pin(1, 52.52, 13.405, "me");
        let far = pin(2, 48.1351, 11.5820, "far");
        let nearby = find_nearby(&me, &[far], 50.0);
        assert!(nearby.is_empty());
    }

    #[test]
    fn render_proximity_crop_produces_nonempty_image() {
        let bounds = RegionBounds { lat_min: 40.0, lat_max: 60.0, lon_min: 0.0, lon_max: 20.0 };
        let projection = Projection::new(bounds, 1000, 1000);
        let map = RgbImage::from_pixel(1000, 1000, Rgb([255, 255, 255]));
        let me = pin(1, 50.0, 10.0, "me");
        let cropped = render_proximity_crop(&map, &projection, &me, 50.0, 150);
        assert!(cropped.width() > 0 && cropped.height() > 0);
    }
}
