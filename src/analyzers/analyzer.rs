use std::sync::Arc;
use tracing::{debug, info};

use crate::analyzers::distance::hourly_distance;
use crate::analyzers::max_temperature::max_temperature;
use crate::analyzers::sample_count::sample_count;
use crate::analyzers::types::HourlyAggregates;
use crate::error::PipelineError;
use crate::geo::DistanceModel;
use crate::sample::Sample;
use crate::sink::ResultSink;
use crate::source::RecordSource;

/// Runs the three aggregations over one batch.
///
/// The passes share the batch read-only and run as parallel blocking tasks.
/// If any of them fails the whole computation fails.
#[tracing::instrument(skip(samples), fields(samples = samples.len(), model = %model))]
pub async fn compute(
    samples: Vec<Sample>,
    model: DistanceModel,
) -> Result<HourlyAggregates, PipelineError> {
    let batch: Arc<[Sample]> = samples.into();

    let max_task = tokio::task::spawn_blocking({
        let batch = Arc::clone(&batch);
        move || max_temperature(&batch)
    });
    let count_task = tokio::task::spawn_blocking({
        let batch = Arc::clone(&batch);
        move || sample_count(&batch)
    });
    let distance_task = tokio::task::spawn_blocking({
        let batch = Arc::clone(&batch);
        move || hourly_distance(&batch, model)
    });

    let (max_temperature, sample_count, distance) =
        tokio::try_join!(max_task, count_task, distance_task)?;

    let aggregates = HourlyAggregates {
        max_temperature: max_temperature?,
        sample_count: sample_count?,
        distance: distance?,
    };

    debug!(
        groups = aggregates.sample_count.rows.len(),
        "Aggregations complete"
    );
    Ok(aggregates)
}

/// Writes all three tables to the sink.
#[tracing::instrument(skip_all)]
pub async fn publish(sink: &dyn ResultSink, aggregates: &HourlyAggregates) -> Result<(), PipelineError> {
    for table in aggregates.tables() {
        sink.write_table(table).await?;
        info!(table = table.name(), rows = table.rows.len(), "Table written");
    }
    Ok(())
}

/// Reads one batch from `source` and computes its aggregates.
#[tracing::instrument(skip_all)]
pub async fn analyze(
    source: &dyn RecordSource,
    model: DistanceModel,
) -> Result<HourlyAggregates, PipelineError> {
    let samples = source.fetch_batch().await?;
    info!(samples = samples.len(), "Batch fetched");
    compute(samples, model).await
}
