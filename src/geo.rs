//! Geographic collaborators: geocoding and planar distance.
//!
//! Both collaborators sit at the crate boundary. Geocoding (location code
//! → lon/lat) is consumed as an opaque capability behind [`Geocoder`] —
//! the crate ships no decoder. Distance is computed by a [`DistanceModel`];
//! the default [`SphericalMercator`] projects both points to WebMercator
//! meters and takes the Euclidean distance, scaled to kilometers.
//!
//! Missing coordinates are not errors anywhere in this module: `distance`
//! yields NaN and callers skip the pair.

use std::f64::consts::PI;

/// WGS84 equatorial radius in meters, the WebMercator sphere radius.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Decodes an opaque location code into (lon, lat).
///
/// Implementations must not panic on malformed input — a bad code is
/// reported as `None`, never as an error crossing this boundary.
pub trait Geocoder: Send + Sync {
    fn try_decode(&self, code: &str) -> Option<(f64, f64)>;
}

/// Computes a geographic distance between two optional coordinate pairs.
pub trait DistanceModel: Send + Sync {
    /// Distance in kilometers, or NaN when any coordinate is absent.
    fn distance_km(
        &self,
        lon1: Option<f64>,
        lat1: Option<f64>,
        lon2: Option<f64>,
        lat2: Option<f64>,
    ) -> f64;

    /// Checked wrapper: `None` on a NaN or infinite result.
    fn try_distance_km(
        &self,
        lon1: Option<f64>,
        lat1: Option<f64>,
        lon2: Option<f64>,
        lat2: Option<f64>,
    ) -> Option<f64> {
        let km = self.distance_km(lon1, lat1, lon2, lat2);
        km.is_finite().then_some(km)
    }
}

/// Planar distance over the WebMercator projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl SphericalMercator {
    /// Forward WebMercator projection: (lon, lat) degrees → (x, y) meters.
    pub fn from_lon_lat(lon: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS_M * lon.to_radians();
        let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }
}

impl DistanceModel for SphericalMercator {
    fn distance_km(
        &self,
        lon1: Option<f64>,
        lat1: Option<f64>,
        lon2: Option<f64>,
        lat2: Option<f64>,
    ) -> f64 {
        let (Some(lon1), Some(lat1), Some(lon2), Some(lat2)) = (lon1, lat1, lon2, lat2)
        else {
            return f64::NAN;
        };
        let (x1, y1) = Self::from_lon_lat(lon1, lat1);
        let (x2, y2) = Self::from_lon_lat(lon2, lat2);
        let dx = x1 - x2;
        let dy = y1 - y2;
        (dx * dx + dy * dy).sqrt() / 1000.0
    }
}
