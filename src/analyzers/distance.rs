//! Distance travelled per `(device, hour)`.
//!
//! Samples are grouped by [`GroupKey`], each group is sorted by full timestamp
//! (equal timestamps by latitude, then longitude, so the walk does not depend
//! on batch order) and ranked from 1. The
//! sample at rank 1 contributes nothing; every later sample contributes the
//! distance to its predecessor in the same group. Groups never chain into
//! each other, so the first sample of an hour bucket is not linked to the
//! last sample of the previous one.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::analyzers::key::{key_at, sample_timestamp};
use crate::analyzers::types::{AggregateRow, AggregateTable, GroupKey, Measure, TableKind};
use crate::error::PipelineError;
use crate::geo::{DistanceModel, GeoPoint};
use crate::parser::parse_location;
use crate::sample::Sample;

/// A decoded sample inside a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub timestamp: DateTime<Utc>,
    pub point: GeoPoint,
}

/// The samples of one group key in timestamp order.
#[derive(Debug, Clone)]
pub struct OrderedGroup {
    waypoints: Vec<Waypoint>,
}

impl OrderedGroup {
    pub fn new(mut waypoints: Vec<Waypoint>) -> Self {
        waypoints.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.point.latitude().total_cmp(&b.point.latitude()))
                .then(a.point.longitude().total_cmp(&b.point.longitude()))
        });
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Distance each waypoint contributes, paired with its 1-based rank.
    pub fn contributions(&self, model: DistanceModel) -> Vec<(usize, f64)> {
        let mut out = Vec::with_capacity(self.waypoints.len());
        let mut previous: Option<&GeoPoint> = None;

        for (i, waypoint) in self.waypoints.iter().enumerate() {
            let km = match previous {
                None => 0.0,
                Some(prev) => model.distance_km(prev, &waypoint.point),
            };
            out.push((i + 1, km));
            previous = Some(&waypoint.point);
        }

        out
    }

    pub fn total_km(&self, model: DistanceModel) -> f64 {
        self.contributions(model).iter().map(|(_, km)| km).sum()
    }
}

/// Partitions the batch into ordered groups, decoding every timestamp and
/// location on the way.
pub fn ordered_groups(samples: &[Sample]) -> Result<BTreeMap<GroupKey, OrderedGroup>, PipelineError> {
    let mut partitions: BTreeMap<GroupKey, Vec<Waypoint>> = BTreeMap::new();

    for (index, sample) in samples.iter().enumerate() {
        let timestamp = sample_timestamp(index, sample)?;
        let point = parse_location(&sample.location)
            .map_err(|e| PipelineError::malformed(index, &sample.device_id, e))?;

        partitions
            .entry(key_at(sample, timestamp))
            .or_default()
            .push(Waypoint { timestamp, point });
    }

    Ok(partitions
        .into_iter()
        .map(|(key, waypoints)| (key, OrderedGroup::new(waypoints)))
        .collect())
}

/// Total distance in kilometres travelled per `(device, hour)`.
pub fn hourly_distance(
    samples: &[Sample],
    model: DistanceModel,
) -> Result<AggregateTable, PipelineError> {
    let groups = ordered_groups(samples)?;

    Ok(AggregateTable {
        kind: TableKind::Distance,
        rows: groups
            .into_iter()
            .map(|(key, group)| AggregateRow::new(key, Measure::Real(group.total_km(model))))
            .collect(),
    })
}
