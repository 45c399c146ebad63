//! One complete run: connect, read, aggregate, write.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::analyzers::analyzer::{analyze, publish};
use crate::analyzers::key::extract_key;
use crate::analyzers::types::HourlyAggregates;
use crate::config::JobConfig;
use crate::error::PipelineError;
use crate::retry::with_retry;
use crate::sink;
use crate::source::{self, RecordSource};

/// Overview of a source batch, produced without writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub samples: usize,
    pub devices: usize,
    pub groups: usize,
}

async fn wait_for_producer(config: &JobConfig) {
    if !config.startup_delay.is_zero() {
        info!(
            delay_secs = config.startup_delay.as_secs(),
            "Waiting for the data producer"
        );
        tokio::time::sleep(config.startup_delay).await;
    }
}

async fn connect_source(config: &JobConfig) -> Result<Box<dyn RecordSource>, PipelineError> {
    let endpoint = &config.source;
    let table = config.source_table.as_str();
    with_retry("source", &config.retry, || source::connect(endpoint, table)).await
}

/// Runs the job described by `config`.
///
/// Nothing is written unless all three aggregations succeed. With `dry_run`
/// the sink is never contacted.
#[tracing::instrument(skip(config), fields(source = %config.source, sink = %config.sink))]
pub async fn run_job(config: &JobConfig, dry_run: bool) -> Result<HourlyAggregates, PipelineError> {
    wait_for_producer(config).await;

    let source = connect_source(config).await?;
    let aggregates = analyze(source.as_ref(), config.distance_model).await?;
    drop(source);

    for table in aggregates.tables() {
        info!(table = table.name(), rows = table.rows.len(), "Aggregate ready");
    }

    if dry_run {
        warn!("Dry run: skipping sink");
        return Ok(aggregates);
    }

    let endpoint = &config.sink;
    let mode = config.write_mode;
    let sink = with_retry("sink", &config.retry, || sink::connect(endpoint, mode)).await?;
    publish(sink.as_ref(), &aggregates).await?;

    info!("Run complete");
    Ok(aggregates)
}

/// Reads the source batch and reports its size and key cardinality.
#[tracing::instrument(skip(config), fields(source = %config.source))]
pub async fn describe(config: &JobConfig) -> Result<BatchSummary, PipelineError> {
    wait_for_producer(config).await;

    let source = connect_source(config).await?;
    let batch = source.fetch_batch().await?;

    let mut devices = BTreeSet::new();
    let mut groups = BTreeSet::new();
    for (index, sample) in batch.iter().enumerate() {
        devices.insert(sample.device_id.as_str());
        groups.insert(extract_key(index, sample)?);
    }

    Ok(BatchSummary {
        samples: batch.len(),
        devices: devices.len(),
        groups: groups.len(),
    })
}
