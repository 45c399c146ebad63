//! Record sources: where the raw sample batch comes from.
//!
//! [`RecordSource`] is the async trait the pipeline reads through.
//! [`DuckDbSource`] reads a table of a DuckDB database file.
//! [`SqlSource`] reads a table of a PostgreSQL or MySQL database.
//! [`CsvSource`] reads a CSV file with a header row.

mod csv;
pub(crate) mod duckdb;
mod sql;

pub use self::csv::CsvSource;
pub use self::duckdb::DuckDbSource;
pub use self::sql::SqlSource;

use async_trait::async_trait;

use crate::config::Endpoint;
use crate::error::PipelineError;
use crate::sample::Sample;

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["device_id", "time", "temperature", "location"];

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Returns the full input batch.
    async fn fetch_batch(&self) -> Result<Vec<Sample>, PipelineError>;
}

/// `device_id, time, temperature, location` as selected from a database, all
/// cast to text.
pub(crate) type TextRow = (Option<String>, Option<String>, Option<String>, Option<String>);

/// Builds the sample at `index` from a [`TextRow`].
pub(crate) fn sample_from_text(index: usize, row: TextRow) -> Result<Sample, PipelineError> {
    let (device_id, time, temperature, location) = row;
    let device_id =
        device_id.ok_or_else(|| PipelineError::malformed(index, "", "device_id is null"))?;
    let temperature = match temperature {
        Some(raw) => Some(raw.trim().parse::<f64>().map_err(|_| {
            PipelineError::malformed(index, &device_id, format!("temperature {raw:?} is not a number"))
        })?),
        None => None,
    };

    Ok(Sample {
        device_id,
        time: time.unwrap_or_default(),
        temperature,
        location: location.unwrap_or_default(),
    })
}

/// Fails with a schema error naming every required column `columns` lacks.
/// Names compare case-insensitively.
pub(crate) fn check_columns(table: &str, columns: &[String]) -> Result<(), PipelineError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c.eq_ignore_ascii_case(required)))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema(format!(
            "table {table} lacks column(s) {}",
            missing.join(", ")
        )))
    }
}

/// An already materialized batch.
#[async_trait]
impl RecordSource for Vec<Sample> {
    async fn fetch_batch(&self) -> Result<Vec<Sample>, PipelineError> {
        Ok(self.clone())
    }
}

/// Opens the source named by `endpoint`.
///
/// A store that does not exist yet, or a table that has not been created yet,
/// is reported as [`PipelineError::ConnectionUnavailable`] so callers can retry.
pub async fn connect(endpoint: &Endpoint, table: &str) -> Result<Box<dyn RecordSource>, PipelineError> {
    match endpoint {
        Endpoint::DuckDb(path) => Ok(Box::new(DuckDbSource::open(path, table).await?)),
        Endpoint::Csv(path) => Ok(Box::new(CsvSource::open(path).await?)),
        Endpoint::Sql { dialect, url } => Ok(Box::new(SqlSource::connect(*dialect, url, table).await?)),
        Endpoint::S3 { .. } => Err(PipelineError::Config(format!(
            "{endpoint} can only be used as a sink"
        ))),
    }
}
