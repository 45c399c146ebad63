//! Result sinks: where the three aggregate tables end up.
//!
//! Every table is written with the columns `row_index, device_id, hour` and
//! the table's value column, rows in group-key order.

mod csv;
mod duckdb;
mod s3;
mod sql;

pub use self::csv::CsvSink;
pub use self::duckdb::DuckDbSink;
pub use self::s3::{S3Sink, write_json_to_s3};
pub use self::sql::SqlSink;

use async_trait::async_trait;
use tracing::warn;

use crate::analyzers::types::AggregateTable;
use crate::config::{Endpoint, WriteMode};
use crate::error::PipelineError;

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persists one complete table under its [`AggregateTable::name`].
    async fn write_table(&self, table: &AggregateTable) -> Result<(), PipelineError>;
}

/// Opens the sink named by `endpoint`.
pub async fn connect(endpoint: &Endpoint, mode: WriteMode) -> Result<Box<dyn ResultSink>, PipelineError> {
    match endpoint {
        Endpoint::DuckDb(path) => Ok(Box::new(DuckDbSink::open(path, mode).await?)),
        Endpoint::Csv(path) => Ok(Box::new(CsvSink::open(path, mode).await?)),
        Endpoint::Sql { dialect, url } => Ok(Box::new(SqlSink::connect(*dialect, url, mode).await?)),
        Endpoint::S3 { bucket, prefix } => {
            if mode == WriteMode::Append {
                warn!(%endpoint, "Object storage sinks always replace; ignoring append mode");
            }
            Ok(Box::new(S3Sink::connect(bucket, prefix).await?))
        }
    }
}
