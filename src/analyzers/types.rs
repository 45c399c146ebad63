//! Data types used by the aggregation pipeline.

use serde::Serialize;
use std::fmt;

/// Aggregation unit: two samples aggregate together iff their keys are equal.
///
/// Ordering is by device, then hour, which is also the row order of every
/// output table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub device_id: String,
    pub hour: u32,
}

/// The value held by one output row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measure {
    Count(u64),
    Real(f64),
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Count(n) => write!(f, "{n}"),
            Measure::Real(v) => write!(f, "{v}"),
        }
    }
}

/// One row per observed group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub device_id: String,
    pub hour: u32,
    pub value: Measure,
}

impl AggregateRow {
    pub fn new(key: GroupKey, value: Measure) -> Self {
        Self {
            device_id: key.device_id,
            hour: key.hour,
            value,
        }
    }
}

/// The three tables the job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    MaxTemperature,
    SampleCount,
    Distance,
}

impl TableKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            TableKind::MaxTemperature => "device_hourly_temperature",
            TableKind::SampleCount => "device_hourly_datapoints",
            TableKind::Distance => "device_hourly_distance",
        }
    }

    pub fn value_column(&self) -> &'static str {
        match self {
            TableKind::MaxTemperature => "max_temperature",
            TableKind::SampleCount => "data_points",
            TableKind::Distance => "distance_km",
        }
    }

    /// SQL type of the value column.
    pub fn value_sql_type(&self) -> &'static str {
        match self {
            TableKind::SampleCount => "UBIGINT",
            TableKind::MaxTemperature | TableKind::Distance => "DOUBLE",
        }
    }
}

/// A complete output table, rows sorted by [`GroupKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub kind: TableKind,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn name(&self) -> &'static str {
        self.kind.table_name()
    }

    pub fn get(&self, device_id: &str, hour: u32) -> Option<Measure> {
        self.rows
            .iter()
            .find(|r| r.device_id == device_id && r.hour == hour)
            .map(|r| r.value)
    }
}

/// JSON shape of an [`AggregateTable`] as written to object storage.
#[derive(Serialize)]
pub struct TableDocument<'a> {
    pub table: &'static str,
    pub value_column: &'static str,
    pub rows: &'a [AggregateRow],
}

impl<'a> From<&'a AggregateTable> for TableDocument<'a> {
    fn from(table: &'a AggregateTable) -> Self {
        Self {
            table: table.kind.table_name(),
            value_column: table.kind.value_column(),
            rows: &table.rows,
        }
    }
}

/// All three tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyAggregates {
    pub max_temperature: AggregateTable,
    pub sample_count: AggregateTable,
    pub distance: AggregateTable,
}

impl HourlyAggregates {
    pub fn tables(&self) -> [&AggregateTable; 3] {
        [&self.max_temperature, &self.sample_count, &self.distance]
    }
}
