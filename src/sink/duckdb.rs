use async_trait::async_trait;
use duckdb::Connection;
use duckdb::types::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::ResultSink;
use crate::analyzers::types::{AggregateTable, Measure};
use crate::config::WriteMode;
use crate::error::PipelineError;
use crate::source::duckdb::{lock, quote_ident};

/// Writes aggregate tables into a DuckDB database file, one transaction per
/// table.
pub struct DuckDbSink {
    conn: Arc<Mutex<Connection>>,
    mode: WriteMode,
}

impl DuckDbSink {
    /// Opens (or creates) the database at `path`. A database locked by another
    /// process is reported as unavailable.
    pub async fn open<P: AsRef<Path>>(path: P, mode: WriteMode) -> Result<Self, PipelineError> {
        let path: PathBuf = path.as_ref().to_path_buf();

        let conn = tokio::task::spawn_blocking(move || {
            Connection::open(&path)
                .map_err(|e| PipelineError::unavailable(format!("sink {}", path.display()), e))
        })
        .await??;

        Ok(Self::from_connection(conn, mode))
    }

    pub fn from_connection(conn: Connection, mode: WriteMode) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            mode,
        }
    }
}

fn measure_value(measure: Measure) -> Value {
    match measure {
        Measure::Count(n) => Value::UBigInt(n),
        Measure::Real(v) => Value::Double(v),
    }
}

#[async_trait]
impl ResultSink for DuckDbSink {
    async fn write_table(&self, table: &AggregateTable) -> Result<(), PipelineError> {
        let conn = self.conn.clone();
        let mode = self.mode;
        let table = table.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let name = quote_ident(table.name());
            let value_column = quote_ident(table.kind.value_column());
            let tx = conn.transaction()?;

            if mode == WriteMode::Replace {
                tx.execute_batch(&format!("DROP TABLE IF EXISTS {name}"))?;
            }
            tx.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {name} (
                    row_index UBIGINT NOT NULL,
                    device_id VARCHAR NOT NULL,
                    hour INTEGER NOT NULL,
                    {value_column} {} NOT NULL
                )",
                table.kind.value_sql_type()
            ))?;

            let first_index: u64 = tx.query_row(
                &format!("SELECT CAST(COALESCE(MAX(row_index) + 1, 0) AS UBIGINT) FROM {name}"),
                [],
                |row| row.get(0),
            )?;

            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO {name} (row_index, device_id, hour, {value_column}) VALUES (?, ?, ?, ?)"
                ))?;
                for (offset, row) in table.rows.iter().enumerate() {
                    stmt.execute(duckdb::params![
                        first_index + offset as u64,
                        row.device_id,
                        row.hour,
                        measure_value(row.value),
                    ])?;
                }
            }

            tx.commit()?;
            debug!(table = table.name(), rows = table.rows.len(), first_index, "DuckDB table written");
            Ok::<(), PipelineError>(())
        })
        .await?
    }
}
