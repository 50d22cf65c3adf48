use serde::{Deserialize, Serialize};

/// Geographic position in degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Same position with the longitude wrapped into `[-180, 180)`.
    pub fn wrapped(self) -> Self {
        Self {
            lat: self.lat,
            lng: wrap_longitude(self.lng),
        }
    }
}

/// Wraps a longitude into `[-180, 180)`.
///
/// Map clients report longitudes past the antimeridian after panning across it
/// (e.g. `190` for `-170`); values already in range come back unchanged.
pub fn wrap_longitude(lng: f64) -> f64 {
    lng - 360.0 * (lng / 360.0 + 0.5).floor()
}
