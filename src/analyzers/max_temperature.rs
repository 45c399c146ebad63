use std::collections::BTreeMap;

use crate::analyzers::key::extract_key;
use crate::analyzers::types::{AggregateRow, AggregateTable, GroupKey, Measure, TableKind};
use crate::error::PipelineError;
use crate::sample::Sample;

/// Maximum temperature per `(device, hour)`.
///
/// A missing or NaN temperature fails the batch rather than being skipped,
/// since dropping it would bias the maximum.
pub fn max_temperature(samples: &[Sample]) -> Result<AggregateTable, PipelineError> {
    let mut groups: BTreeMap<GroupKey, f64> = BTreeMap::new();

    for (index, sample) in samples.iter().enumerate() {
        let key = extract_key(index, sample)?;
        let temperature = match sample.temperature {
            Some(t) if !t.is_nan() => t,
            Some(_) => {
                return Err(PipelineError::malformed(
                    index,
                    &sample.device_id,
                    "temperature is NaN",
                ));
            }
            None => {
                return Err(PipelineError::malformed(
                    index,
                    &sample.device_id,
                    "temperature is missing",
                ));
            }
        };

        groups
            .entry(key)
            .and_modify(|max| *max = max.max(temperature))
            .or_insert(temperature);
    }

    Ok(AggregateTable {
        kind: TableKind::MaxTemperature,
        rows: groups
            .into_iter()
            .map(|(key, max)| AggregateRow::new(key, Measure::Real(max)))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(device: &str, time: &str, temp: Option<f64>) -> Sample {
        Sample::new(device, time, temp, r#"[{"latitude": 0, "longitude": 0}]"#)
    }

    #[test]
    fn test_single_sample_group_is_its_temperature() {
        let table = max_temperature(&[sample("d1", "2024-03-01 10:00:00", Some(21.5))]).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.get("d1", 10), Some(Measure::Real(21.5)));
    }

    #[test]
    fn test_max_per_group() {
        let samples = vec![
            sample("d1", "2024-03-01 10:00:00", Some(12.0)),
            sample("d1", "2024-03-01 10:30:00", Some(19.0)),
            sample("d1", "2024-03-02 10:05:00", Some(-3.0)),
            sample("d1", "2024-03-01 11:00:00", Some(40.0)),
            sample("d2", "2024-03-01 10:00:00", Some(-8.0)),
        ];
        let table = max_temperature(&samples).unwrap();

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.get("d1", 10), Some(Measure::Real(19.0)));
        assert_eq!(table.get("d1", 11), Some(Measure::Real(40.0)));
        assert_eq!(table.get("d2", 10), Some(Measure::Real(-8.0)));
    }

    #[test]
    fn test_permutation_invariant() {
        let mut samples = vec![
            sample("d1", "1700000000", Some(1.0)),
            sample("d2", "1700000100", Some(7.0)),
            sample("d1", "1700000200", Some(5.0)),
            sample("d1", "1700003700", Some(3.0)),
        ];
        let expected = max_temperature(&samples).unwrap();
        samples.reverse();
        assert_eq!(max_temperature(&samples).unwrap(), expected);
        samples.rotate_left(1);
        assert_eq!(max_temperature(&samples).unwrap(), expected);
    }

    #[test]
    fn test_nan_temperature_rejected() {
        let samples = vec![
            sample("d1", "2024-03-01 10:00:00", Some(12.0)),
            sample("d1", "2024-03-01 10:30:00", Some(f64::NAN)),
        ];
        let err = max_temperature(&samples).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn test_missing_temperature_rejected() {
        let err = max_temperature(&[sample("d1", "2024-03-01 10:00:00", None)]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        assert!(max_temperature(&[]).unwrap().rows.is_empty());
    }
}
