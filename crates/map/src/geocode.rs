//! Forward geocoding through a nominatim-like HTTP service (§4.6).

use serde::Deserialize;
use syncd_core::models::RegionBounds;
use syncd_core::SyncError;
use syncd_net::HttpFetcher;

use crate::regions::Projection;

/// One successfully geocoded location, ready to persist as a `MapPin`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

/// Geocode `query` and validate the result falls inside `bounds`. Out-of-region
/// results are rejected rather than silently accepted (§4.6, §7 `OutOfBounds`).
pub async fn geocode(fetcher: &HttpFetcher, base_url: &str, query: &str, bounds: &RegionBounds) -> Result<GeocodedPlace, SyncError> {
    let url = format!(
        "{base_url}/search?q={}&format=jsonv2&limit=1",
        urlencoding_encode(query)
    );
    let results: Vec<NominatimResult> = fetcher.fetch_json(&url).await?;
    let Some(first) = results.into_iter().next() else {
        return Err(SyncError::PermanentSource(format!("no geocoding result for {query:?}")));
    };

    let latitude: f64 = first
        .lat
        .parse()
        .map_err(|_| SyncError::PermanentSource(format!("geocoder returned non-numeric latitude: {}", first.lat)))?;
    let longitude: f64 = first
        .lon
        .parse()
        .map_err(|_| SyncError::PermanentSource(format!("geocoder returned non-numeric longitude: {}", first.lon)))?;

    let projection = Projection::new(*bounds, 1, 1);
    if !projection.in_bounds(latitude, longitude) {
        return Err(SyncError::OutOfBounds(format!(
            "{query:?} resolved to ({latitude}, {longitude}), outside the configured region"
        )));
    }

    Ok(GeocodedPlace { latitude, longitude, display_name: first.display_name })
}

/// Minimal percent-encoding for a geocoder query string; avoids pulling in a
/// dedicated URL crate for one call site.
fn urlencoding_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_spaces_and_commas() {
        assert_eq!(urlencoding_encode("Berlin, Germany"), "Berlin%2C%20Germany");
    }

    #[test]
    fn leaves_safe_characters_untouched() {
        assert_eq!(urlencoding_encode("abc-123_.~"), "abc-123_.~");
    }
}
