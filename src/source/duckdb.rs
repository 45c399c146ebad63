use async_trait::async_trait;
use duckdb::{AccessMode, Config, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::{RecordSource, TextRow, check_columns, sample_from_text};
use crate::error::PipelineError;
use crate::sample::Sample;

/// Reads samples from one table of a DuckDB database file.
pub struct DuckDbSource {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl DuckDbSource {
    /// Opens `path` read-only and checks the table's columns.
    ///
    /// Read-only mode never creates the file, so a database the producer has
    /// not written yet shows up as unavailable instead of as an empty store.
    pub async fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self, PipelineError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let table = table.to_string();

        tokio::task::spawn_blocking(move || {
            let config = Config::default().access_mode(AccessMode::ReadOnly)?;
            let conn = Connection::open_with_flags(&path, config)
                .map_err(|e| PipelineError::unavailable(format!("source {}", path.display()), e))?;
            Self::from_connection(conn, &table)
        })
        .await?
    }

    /// Wraps an open connection, introspecting `table`.
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self, PipelineError> {
        let columns = table_columns(&conn, table)?;
        if columns.is_empty() {
            return Err(PipelineError::unavailable(
                format!("source table {table}"),
                "table does not exist yet",
            ));
        }

        check_columns(table, &columns)?;

        debug!(table, ?columns, "Source table mapped");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, PipelineError> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE lower(table_name) = lower(?)
         ORDER BY ordinal_position",
    )?;
    let rows = stmt.query_map(duckdb::params![table], |row| row.get::<_, String>(0))?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, PipelineError> {
    conn.lock()
        .map_err(|_| PipelineError::Storage("connection lock poisoned".to_string()))
}

#[async_trait]
impl RecordSource for DuckDbSource {
    async fn fetch_batch(&self) -> Result<Vec<Sample>, PipelineError> {
        let conn = self.conn.clone();
        let sql = format!(
            "SELECT CAST(device_id AS VARCHAR), CAST(\"time\" AS VARCHAR),
                    CAST(temperature AS VARCHAR), CAST(location AS VARCHAR)
             FROM {}",
            quote_ident(&self.table)
        );

        let raw: Vec<TextRow> = tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| -> duckdb::Result<TextRow> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;

            let mut raw = Vec::new();
            for row in rows {
                raw.push(row?);
            }
            Ok::<_, PipelineError>(raw)
        })
        .await??;

        raw.into_iter()
            .enumerate()
            .map(|(index, row)| sample_from_text(index, row))
            .collect()
    }
}
