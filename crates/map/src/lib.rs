//! Region rasterization, pin management, and proximity search (§4.6 C6).

pub mod board;
pub mod cache;
pub mod geocode;
pub mod pins;
pub mod proximity;
pub mod regions;
pub mod render;
pub mod settings;

pub use board::{render_and_post_board, MapEngineConfig};
pub use cache::ImageCache;
pub use geocode::{geocode as geocode_place, GeocodedPlace};
pub use proximity::{find_nearby, haversine_km, render_proximity_crop, NearbyMember};
pub use settings::{validate as validate_visual_settings, ResolvedVisualSettings, VisualSettingsUpdate};
