//! Geographic coordinates and distance.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors that can occur when constructing [`Coordinates`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CoordinatesError {
    /// Longitude outside [-180,180].
    #[error("longitude must be in [-180,180], got {0}")]
    InvalidLongitude(f64),
    /// Latitude outside [-90,90].
    #[error("latitude must be in [-90,90], got {0}")]
    InvalidLatitude(f64),
    /// Not a finite number.
    #[error("coordinate is not a finite number")]
    NotFinite,
}

/// A validated longitude/latitude pair (in that order, GeoJSON style).
///
/// ```
/// use savory_core::Coordinates;
///
/// let p = Coordinates::new(-79.38, 43.65).unwrap();
/// assert!((p.lng() - -79.38).abs() < f64::EPSILON);
/// assert!(Coordinates::new(-200.0, 0.0).is_err());
/// assert!(Coordinates::new(0.0, 91.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    lng: f64,
    lat: f64,
}

impl Coordinates {
    /// Construct validated coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if either component is non-finite or out of range.
    pub fn new(lng: f64, lat: f64) -> Result<Self, CoordinatesError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(CoordinatesError::NotFinite);
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinatesError::InvalidLongitude(lng));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinatesError::InvalidLatitude(lat));
        }
        Ok(Self { lng, lat })
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Great-circle distance to another point, in meters.
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        haversine_meters(self.lng, self.lat, other.lng, other.lat)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

/// Haversine great-circle distance between two lng/lat points, in meters.
///
/// This is the same formula the proximity query evaluates in SQL, kept here
/// so the radius contract can be checked without a database.
#[must_use]
pub fn haversine_meters(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_range() {
        assert!(Coordinates::new(-79.4, 43.7).is_ok());
        assert!(matches!(
            Coordinates::new(-181.0, 0.0),
            Err(CoordinatesError::InvalidLongitude(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -90.5),
            Err(CoordinatesError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinates::new(f64::NAN, 0.0),
            Err(CoordinatesError::NotFinite)
        ));
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert!(haversine_meters(-79.4, 43.7, -79.4, 43.7).abs() < 1e-6);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Toronto City Hall to the CN Tower is roughly 1.1 km.
        let d = haversine_meters(-79.3832, 43.6535, -79.3871, 43.6426);
        assert!(d > 1_000.0 && d < 1_400.0, "got {d}");
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = haversine_meters(-79.0, 43.0, -78.0, 44.0);
        let b = haversine_meters(-78.0, 44.0, -79.0, 43.0);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_ten_km_radius_boundary() {
        // Roughly 0.09 degrees of latitude is 10 km; a point just inside the
        // radius must measure under 10_000 m and one well outside must not.
        let inside = haversine_meters(-79.0, 43.0, -79.0, 43.085);
        let outside = haversine_meters(-79.0, 43.0, -79.0, 43.2);
        assert!(inside < 10_000.0, "got {inside}");
        assert!(outside > 10_000.0, "got {outside}");
    }
}
