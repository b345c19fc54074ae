//! Base-map rasterization from Natural Earth shapefiles (§4.6 step 1).
//!
//! Grounded in `original_source/core/map_gen.py::render_geopandas_map`: the same
//! five vector layers, drawn in the same order (ocean fill, land, lakes, rivers,
//! state borders, country borders), with line widths scaled by
//! [`crate::regions::geographic_scale_factor`] instead of geopandas/Pillow.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use shapefile::{Reader, Shape};
use syncd_core::models::{MapRegion, RegionBounds, RgbColor};
use syncd_core::SyncError;

use crate::regions::{geographic_scale_factor, Projection};

/// The five Natural Earth layers the source loads from `data/` next to the
/// bot's data directory.
struct Layers {
    countries: PathBuf,
    states: PathBuf,
    land: PathBuf,
    lakes: PathBuf,
    rivers: PathBuf,
}

impl Layers {
    fn under(data_dir: &Path) -> Self {
        Self {
            countries: data_dir.join("ne_10m_admin_0_countries.shp"),
            states: data_dir.join("ne_10m_admin_1_states_provinces.shp"),
            land: data_dir.join("ne_10m_land.shp"),
            lakes: data_dir.join("ne_10m_lakes.shp"),
            rivers: data_dir.join("ne_10m_rivers_lake_centerlines.shp"),
        }
    }
}

/// Visual settings for one render, already validated (§4.6 visual-settings note).
#[derive(Debug, Clone)]
pub struct Visuals {
    pub land_color: RgbColor,
    pub water_color: RgbColor,
    pub country_border_color: RgbColor,
    pub state_border_color: RgbColor,
    pub river_color: RgbColor,
}

/// Render the base map (no pins) for `bounds` at `width`×`height` (§4.6 step 1).
pub fn render_base_map(
    data_dir: &Path,
    region: MapRegion,
    bounds: &RegionBounds,
    width: u32,
    height: u32,
    visuals: &Visuals,
) -> Result<RgbImage, SyncError> {
    let layers = Layers::under(data_dir);
    let projection = Projection::new(*bounds, width, height);
    let scale = geographic_scale_factor(bounds);

    let mut image = RgbImage::from_pixel(width, height, to_rgb(&visuals.water_color));

    draw_polygon_layer(&mut image, &layers.land, &projection, to_rgb(&visuals.land_color))?;
    draw_polygon_layer(&mut image, &layers.lakes, &projection, to_rgb(&visuals.water_color))?;

    // World maps omit state borders entirely and thin every remaining line by an
    // extra 0.5x (§4.6's "world maps apply an additional 0.5x thinning").
    let is_world = matches!(region, MapRegion::World);
    let thinning = if is_world { 0.5 } else { 1.0 };
    let river_width = line_width(region, scale, thinning, 1.0);
    let country_width = line_width(region, scale, thinning, 1.0);
    let state_width = if is_world { 0 } else { line_width(region, scale, thinning, 0.5) };

    if river_width > 0 {
        draw_line_layer(&mut image, &layers.rivers, &projection, to_rgb(&visuals.river_color), river_width)?;
    }
    if state_width > 0 {
        draw_outline_layer(&mut image, &layers.states, &projection, to_rgb(&visuals.state_border_color), state_width)?;
    }
    if country_width > 0 {
        draw_outline_layer(&mut image, &layers.countries, &projection, to_rgb(&visuals.country_border_color), country_width)?;
    }

    Ok(image)
}

/// Base line width in px: `germany` gets thicker reference widths (§4.6), every
/// other region scales from a thinner base by the geographic-area factor.
fn line_width(region: MapRegion, scale: f64, world_thinning: f64, weight: f64) -> u32 {
    let base = if matches!(region, MapRegion::Germany) { 3.0 } else { 1.0 };
    let width = base * scale.clamp(0.3, 8.0) * world_thinning * weight;
    width.round().max(if matches!(region, MapRegion::Germany) { 1.0 } else { 0.0 }) as u32
}

fn to_rgb(color: &RgbColor) -> Rgb<u8> {
    let [r, g, b] = color.to_rgb().unwrap_or([0, 0, 0]);
    Rgb([r, g, b])
}

fn draw_polygon_layer(image: &mut RgbImage, path: &Path, projection: &Projection, color: Rgb<u8>) -> Result<(), SyncError> {
    for ring in read_rings(path)? {
        fill_ring(image, &ring, projection, color);
    }
    Ok(())
}

fn draw_outline_layer(image: &mut RgbImage, path: &Path, projection: &Projection, color: Rgb<u8>, width: u32) -> Result<(), SyncError> {
    for ring in read_rings(path)? {
        stroke_ring(image, &ring, projection, color, width);
    }
    Ok(())
}

fn draw_line_layer(image: &mut RgbImage, path: &Path, projection: &Projection, color: Rgb<u8>, width: u32) -> Result<(), SyncError> {
    for line in read_polylines(path)? {
        stroke_ring(image, &line, projection, color, width);
    }
    Ok(())
}

/// One ring/polyline's lat/lon vertices, in `(lat, lon)` order matching the
/// source's own `(y, x)` unpacking of shapely coordinates.
type Ring = Vec<(f64, f64)>;

fn read_rings(path: &Path) -> Result<Vec<Ring>, SyncError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "map layer shapefile missing, skipping layer");
        return Ok(Vec::new());
    }
    let mut reader = Reader::from_path(path).map_err(|e| SyncError::Internal(format!("shapefile open error: {e}")))?;
    let mut rings = Vec::new();
    for shape in reader.iter_shapes() {
        let shape = shape.map_err(|e| SyncError::Internal(format!("shapefile read error: {e}")))?;
        match shape {
            Shape::Polygon(polygon) => {
                for ring in polygon.rings() {
                    rings.push(ring.points().iter().map(|p| (p.y, p.x)).collect());
                }
            }
            Shape::PolygonZ(polygon) => {
                for ring in polygon.rings() {
                    rings.push(ring.points().iter().map(|p| (p.y, p.x)).collect());
                }
            }
            _ => {}
        }
    }
    Ok(rings)
}

fn read_polylines(path: &Path) -> Result<Vec<Ring>, SyncError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "map layer shapefile missing, skipping layer");
        return Ok(Vec::new());
    }
    let mut reader = Reader::from_path(path).map_err(|e| SyncError::Internal(format!("shapefile open error: {e}")))?;
    let mut lines = Vec::new();
    for shape in reader.iter_shapes() {
        let shape = shape.map_err(|e| SyncError::Internal(format!("shapefile read error: {e}")))?;
        match shape {
            Shape::Polyline(polyline) => {
                for part in polyline.parts() {
                    lines.push(part.iter().map(|p| (p.y, p.x)).collect());
                }
            }
            Shape::PolylineZ(polyline) => {
                for part in polyline.parts() {
                    lines.push(part.iter().map(|p| (p.y, p.x)).collect());
                }
            }
            _ => {}
        }
    }
    Ok(lines)
}

fn fill_ring(image: &mut RgbImage, ring: &Ring, projection: &Projection, color: Rgb<u8>) {
    // The precise translation of the source's `draw.polygon`: fill the ring's
    // actual outline, not its bounding box, so non-rectangular coastlines and
    // islands don't flood the surrounding water.
    let mut points: Vec<_> = ring
        .iter()
        .map(|&(lat, lon)| {
            let pixel = projection.project(lat, lon);
            Point::new(clamp_to_i32(pixel.x), clamp_to_i32(pixel.y))
        })
        .collect();
    points.dedup();
    if points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return;
    }
    draw_polygon_mut(image, &points, color);
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn stroke_ring(image: &mut RgbImage, ring: &Ring, projection: &Projection, color: Rgb<u8>, width: u32) {
    if ring.len() < 2 {
        return;
    }
    let pixels: Vec<_> = ring.iter().map(|&(lat, lon)| projection.project(lat, lon)).collect();
    for pair in pixels.windows(2) {
        let [a, b] = pair else { continue };
        for offset in 0..width.max(1) {
            let o = f32::from(u16::try_from(offset).unwrap_or(0));
            draw_line_segment_mut(
                image,
                (a.x as f32, a.y as f32 + o),
                (b.x as f32, b.y as f32 + o),
                color,
            );
        }
    }
}

