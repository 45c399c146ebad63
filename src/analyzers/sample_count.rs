use std::collections::BTreeMap;

use crate::analyzers::key::extract_key;
use crate::analyzers::types::{AggregateRow, AggregateTable, GroupKey, Measure, TableKind};
use crate::error::PipelineError;
use crate::sample::Sample;

/// Number of samples per `(device, hour)`.
pub fn sample_count(samples: &[Sample]) -> Result<AggregateTable, PipelineError> {
    let mut groups: BTreeMap<GroupKey, u64> = BTreeMap::new();

    for (index, sample) in samples.iter().enumerate() {
        *groups.entry(extract_key(index, sample)?).or_default() += 1;
    }

    Ok(AggregateTable {
        kind: TableKind::SampleCount,
        rows: groups
            .into_iter()
            .map(|(key, n)| AggregateRow::new(key, Measure::Count(n)))
            .collect(),
    })
}
