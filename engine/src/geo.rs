//! Coordinates and straight line distances.

use crate::{Result, RoutingError};
use nav_types::WGS84;
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }

    /// Checks that the coordinate is finite and within the valid degree ranges.
    pub fn validated(self) -> Result<Self> {
        if self.lat.is_finite() && self.lon.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon) {
            Ok(self)
        } else {
            Err(RoutingError::InvalidCoordinates { lat: self.lat, lon: self.lon })
        }
    }

    fn as_wgs84(&self) -> WGS84<f64> {
        WGS84::from_degrees_and_meters(self.lat, self.lon, 0.0)
    }

    /// Straight line distance in meters.
    ///
    /// This is the chord through the earth, never longer than the great circle distance
    /// and thus never longer than any road between the two points.
    pub fn distance(&self, other: &LatLon) -> f64 {
        self.as_wgs84().distance(&other.as_wgs84())
    }
}

impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_111km() {
        let d = LatLon::new(0.0, 0.0).distance(&LatLon::new(1.0, 0.0));
        assert!((d - 110_574.0).abs() < 1_000.0, "{}", d);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_same_point() {
        let a = LatLon::new(43.727687, 7.418737);
        let b = LatLon::new(43.74958, 7.436566);
        assert_eq!(a.distance(&a), 0.0);
        assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(LatLon::new(91.0, 0.0).validated().is_err());
        assert!(LatLon::new(0.0, -180.5).validated().is_err());
        assert!(LatLon::new(f64::NAN, 0.0).validated().is_err());
        assert!(LatLon::new(-90.0, 180.0).validated().is_ok());
    }
}
