//! Hourly telemetry aggregation.
//!
//! Every sample is keyed by device and UTC hour of day; the batch is then
//! reduced three ways (maximum temperature, sample count, distance travelled)
//! into one table each.

pub mod analyzer;
pub mod distance;
pub mod key;
pub mod max_temperature;
pub mod sample_count;
pub mod types;
