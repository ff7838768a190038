use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius (meters) of the spherical model used for route lengths.
///
/// Matches the radius web mapping widgets use for `distanceTo`.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic point in decimal degrees.
///
/// Serialized as a `[lat, lon]` pair, the shape route geometries use on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lon]
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLatLngError(pub String);

impl fmt::Display for ParseLatLngError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid coordinate {:?} (expected \"lat,lon\")", self.0)
    }
}

impl std::error::Error for ParseLatLngError {}

impl FromStr for LatLng {
    type Err = ParseLatLngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLatLngError(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(err)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| err())?;
        let lon = lon.trim().parse::<f64>().map_err(|_| err())?;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(err());
        }
        Ok(LatLng { lat, lon })
    }
}

/// Great-circle distance in meters (haversine on a sphere of [`EARTH_RADIUS_M`]).
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let sin_dlat = ((b.lat - a.lat).to_radians() * 0.5).sin();
    let sin_dlon = ((b.lon - a.lon).to_radians() * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Sum of consecutive great-circle distances, in kilometers.
///
/// Zero for sequences of length 0 or 1.
pub fn path_length_km(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_m(w[0], w[1]))
        .sum::<f64>()
        / 1000.0
}
