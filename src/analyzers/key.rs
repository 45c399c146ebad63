use chrono::{DateTime, Timelike, Utc};

use crate::analyzers::types::GroupKey;
use crate::error::PipelineError;
use crate::parser::parse_timestamp;
use crate::sample::Sample;

/// Full timestamp of the sample at `index` in the batch.
pub fn sample_timestamp(index: usize, sample: &Sample) -> Result<DateTime<Utc>, PipelineError> {
    parse_timestamp(&sample.time).ok_or_else(|| {
        PipelineError::malformed(
            index,
            &sample.device_id,
            format!("timestamp {:?} has no hour component", sample.time),
        )
    })
}

/// `(device_id, hour_of_day)` of the sample at `index`, hour taken in UTC.
pub fn extract_key(index: usize, sample: &Sample) -> Result<GroupKey, PipelineError> {
    let ts = sample_timestamp(index, sample)?;
    Ok(key_at(sample, ts))
}

pub(crate) fn key_at(sample: &Sample, ts: DateTime<Utc>) -> GroupKey {
    GroupKey {
        device_id: sample.device_id.clone(),
        hour: ts.hour(),
    }
}
