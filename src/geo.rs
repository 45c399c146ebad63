//! Geodesic distance between two geographic points.

use geo::{Distance, Geodesic, Haversine, Point};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidCoordinate`] when either value is not
    /// finite or lies outside [-90, 90] / [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PipelineError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(PipelineError::InvalidCoordinate(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(PipelineError::InvalidCoordinate(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Earth model used to measure the distance between consecutive samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceModel {
    /// Haversine on a sphere of mean Earth radius (6371.0088 km).
    #[default]
    GreatCircle,
    /// Karney's geodesic on the WGS-84 ellipsoid.
    Ellipsoidal,
}

impl DistanceModel {
    /// Distance between `a` and `b` in kilometres. Exactly 0 for identical points.
    pub fn distance_km(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        if a == b {
            return 0.0;
        }
        let (a, b) = (a.to_point(), b.to_point());
        let metres = match self {
            DistanceModel::GreatCircle => Haversine.distance(a, b),
            DistanceModel::Ellipsoidal => Geodesic.distance(a, b),
        };
        metres / 1000.0
    }
}

impl FromStr for DistanceModel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "great-circle" | "great_circle" | "haversine" => Ok(DistanceModel::GreatCircle),
            "ellipsoidal" | "wgs84" | "geodesic" => Ok(DistanceModel::Ellipsoidal),
            other => Err(PipelineError::Config(format!(
                "unknown distance model {other:?} (expected great-circle or ellipsoidal)"
            ))),
        }
    }
}

impl fmt::Display for DistanceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceModel::GreatCircle => f.write_str("great-circle"),
            DistanceModel::Ellipsoidal => f.write_str("ellipsoidal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_identical_points_are_zero() {
        let p = point(48.8566, 2.3522);
        assert_eq!(DistanceModel::GreatCircle.distance_km(&p, &p), 0.0);
        assert_eq!(DistanceModel::Ellipsoidal.distance_km(&p, &p), 0.0);
    }

    #[test]
    fn test_one_degree_longitude_on_equator() {
        let d = DistanceModel::GreatCircle.distance_km(&point(0.0, 0.0), &point(0.0, 1.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_one_degree_latitude_near_equator_within_one_percent() {
        for model in [DistanceModel::GreatCircle, DistanceModel::Ellipsoidal] {
            let d = model.distance_km(&point(0.0, 0.0), &point(1.0, 0.0));
            assert!((d - 111.0).abs() < 1.11, "{model}: got {d}");
        }
    }

    #[test]
    fn test_ellipsoidal_equator_degree() {
        let d = DistanceModel::Ellipsoidal.distance_km(&point(0.0, 0.0), &point(0.0, 1.0));
        assert!((d - 111.319).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric_and_non_negative() {
        let a = point(40.7128, -74.0060);
        let b = point(51.5074, -0.1278);
        for model in [DistanceModel::GreatCircle, DistanceModel::Ellipsoidal] {
            let ab = model.distance_km(&a, &b);
            let ba = model.distance_km(&b, &a);
            assert!(ab > 5500.0 && ab < 5600.0, "{model}: got {ab}");
            assert!((ab - ba).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nearly_antipodal_ellipsoidal() {
        let d = DistanceModel::Ellipsoidal.distance_km(&point(0.0, 0.0), &point(0.0, 179.5));
        assert!((d - 19980.862).abs() < 0.01, "got {d}");

        let d = DistanceModel::Ellipsoidal.distance_km(&point(0.0, 0.0), &point(0.0, 180.0));
        assert!((d - 20003.931).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        assert!(matches!(
            GeoPoint::new(90.5, 0.0),
            Err(PipelineError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, -180.01),
            Err(PipelineError::InvalidCoordinate(_))
        ));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_parse_distance_model() {
        assert_eq!(
            "great-circle".parse::<DistanceModel>().unwrap(),
            DistanceModel::GreatCircle
        );
        assert_eq!(
            "Geodesic".parse::<DistanceModel>().unwrap(),
            DistanceModel::Ellipsoidal
        );
        assert!("planar".parse::<DistanceModel>().is_err());
    }
}
