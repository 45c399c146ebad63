//! CSV persistence of aggregate tables: one `<table>.csv` per table.

use async_trait::async_trait;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ResultSink;
use crate::analyzers::types::AggregateTable;
use crate::config::WriteMode;
use crate::error::PipelineError;

pub struct CsvSink {
    dir: PathBuf,
    mode: WriteMode,
}

impl CsvSink {
    /// Uses `dir` as the output directory, creating it if needed.
    pub async fn open<P: AsRef<Path>>(dir: P, mode: WriteMode) -> Result<Self, PipelineError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::unavailable(format!("sink {}", dir.display()), e))?;
        Ok(Self { dir, mode })
    }

    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.dir.join(format!("{table_name}.csv"))
    }
}

/// Writes `table` to `path`. In append mode the header is only written when
/// the file is created, and row indices continue from the rows already there.
pub fn write_csv_table(path: &Path, table: &AggregateTable, mode: WriteMode) -> Result<(), PipelineError> {
    let file_exists = path.exists();
    let append = mode == WriteMode::Append && file_exists;
    let first_index = if append {
        existing_rows(path).map_err(|e| storage_error(path, e))?
    } else {
        0
    };
    debug!(path = %path.display(), append, first_index, "Writing CSV table");

    let file = if append {
        OpenOptions::new().append(true).open(path)
    } else {
        OpenOptions::new().write(true).create(true).truncate(true).open(path)
    }
    .map_err(|e| storage_error(path, e))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    if !append {
        writer
            .write_record(["row_index", "device_id", "hour", table.kind.value_column()])
            .map_err(|e| storage_error(path, e))?;
    }
    for (offset, row) in table.rows.iter().enumerate() {
        writer
            .write_record([
                (first_index + offset as u64).to_string(),
                row.device_id.clone(),
                row.hour.to_string(),
                row.value.to_string(),
            ])
            .map_err(|e| storage_error(path, e))?;
    }
    writer.flush().map_err(|e| storage_error(path, e))?;

    Ok(())
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Storage(format!("{}: {e}", path.display()))
}

fn existing_rows(path: &Path) -> Result<u64, csv::Error> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut n = 0;
    for record in rdr.records() {
        record?;
        n += 1;
    }
    Ok(n)
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn write_table(&self, table: &AggregateTable) -> Result<(), PipelineError> {
        let path = self.table_path(table.name());
        let mode = self.mode;
        let table = table.clone();

        tokio::task::spawn_blocking(move || write_csv_table(&path, &table, mode)).await?
    }
}
