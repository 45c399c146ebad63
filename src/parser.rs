//! Decoding of the stored text fields of a [`Sample`](crate::sample::Sample).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::geo::GeoPoint;

/// Why a `location` value could not be turned into a single point.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("location is not a JSON list of points: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("location holds {0} points, expected exactly one")]
    PointCount(usize),
    #[error(transparent)]
    Coordinate(#[from] PipelineError),
}

#[derive(Deserialize)]
struct LocationEntry {
    latitude: Coordinate,
    longitude: Coordinate,
}

/// Generators write coordinates either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self, axis: &str) -> Result<f64, PipelineError> {
        match self {
            Coordinate::Number(v) => Ok(*v),
            Coordinate::Text(s) => s.trim().parse().map_err(|_| {
                PipelineError::InvalidCoordinate(format!("{axis} {s:?} is not a number"))
            }),
        }
    }
}

/// Decodes a location like `[{"latitude": "52.1", "longitude": "4.3"}]`.
///
/// # Errors
///
/// Fails unless the text is a JSON list holding exactly one point with valid
/// coordinates.
pub fn parse_location(raw: &str) -> Result<GeoPoint, LocationError> {
    let entries: Vec<LocationEntry> = serde_json::from_str(raw)?;
    match entries.as_slice() {
        [entry] => {
            let latitude = entry.latitude.value("latitude")?;
            let longitude = entry.longitude.value("longitude")?;
            Ok(GeoPoint::new(latitude, longitude)?)
        }
        other => Err(LocationError::PointCount(other.len())),
    }
}

/// Parses a stored timestamp. Accepted encodings:
///
/// - Unix epoch seconds (`"1700000000"`)
/// - RFC 3339 (`"2024-03-01T10:15:00Z"`)
/// - SQL text with offset (`"2024-03-01 10:15:00.123+00"`)
/// - SQL text without offset, read as UTC (`"2024-03-01 10:15:00"`)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) || raw.starts_with('-') {
        if let Ok(secs) = raw.parse::<i64>() {
            return DateTime::from_timestamp(secs, 0);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_location_numeric_strings() {
        let p = parse_location(r#"[{"latitude": "52.37", "longitude": "4.89"}]"#).unwrap();
        assert_eq!(p.latitude(), 52.37);
        assert_eq!(p.longitude(), 4.89);
    }

    #[test]
    fn test_parse_location_numbers() {
        let p = parse_location(r#"[{"latitude": -33.9, "longitude": 151.2}]"#).unwrap();
        assert_eq!(p.latitude(), -33.9);
    }

    #[test]
    fn test_parse_location_empty_list() {
        assert!(matches!(
            parse_location("[]"),
            Err(LocationError::PointCount(0))
        ));
    }

    #[test]
    fn test_parse_location_two_points() {
        let raw = r#"[{"latitude": 1, "longitude": 1}, {"latitude": 2, "longitude": 2}]"#;
        assert!(matches!(
            parse_location(raw),
            Err(LocationError::PointCount(2))
        ));
    }

    #[test]
    fn test_parse_location_not_json() {
        assert!(matches!(
            parse_location("52.37,4.89"),
            Err(LocationError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_location_out_of_range() {
        let err = parse_location(r#"[{"latitude": 95, "longitude": 0}]"#).unwrap_err();
        assert!(matches!(
            err,
            LocationError::Coordinate(PipelineError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_parse_location_non_numeric_coordinate() {
        let err = parse_location(r#"[{"latitude": "north", "longitude": "0"}]"#).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_parse_timestamp_epoch_seconds() {
        let ts = parse_timestamp("1700000000").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.hour(), 22);
    }

    #[test]
    fn test_parse_timestamp_rfc3339_with_offset() {
        let ts = parse_timestamp("2024-03-01T10:15:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_parse_timestamp_sql_forms() {
        assert_eq!(parse_timestamp("2024-03-01 10:15:00").unwrap().hour(), 10);
        assert_eq!(parse_timestamp("2024-03-01 10:15:00.250").unwrap().hour(), 10);
        assert_eq!(parse_timestamp("2024-03-01 23:59:59+00").unwrap().hour(), 23);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-01 10:00:00").is_none());
    }
}
