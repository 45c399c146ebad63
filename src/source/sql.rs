use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use tracing::debug;

use super::{RecordSource, TextRow, check_columns, sample_from_text};
use crate::error::PipelineError;
use crate::sample::Sample;
use crate::sql::{SqlDialect, connect_pool};

/// Reads samples from one table of a PostgreSQL or MySQL database.
pub struct SqlSource {
    pool: AnyPool,
    dialect: SqlDialect,
    /// Table name as stored by the server.
    table: String,
}

impl SqlSource {
    /// Connects and checks the table's columns. A server that refuses the
    /// connection, or a table that does not exist yet, is unavailable.
    pub async fn connect(dialect: SqlDialect, url: &str, table: &str) -> Result<Self, PipelineError> {
        let pool = connect_pool(url, "source").await?;
        let (stored_name, columns) = table_columns(&pool, dialect, table).await?;

        let Some(stored_name) = stored_name else {
            return Err(PipelineError::unavailable(
                format!("source table {table}"),
                "table does not exist yet",
            ));
        };
        check_columns(table, &columns)?;

        debug!(table = %stored_name, ?columns, %dialect, "Source table mapped");
        Ok(Self {
            pool,
            dialect,
            table: stored_name,
        })
    }
}

async fn table_columns(
    pool: &AnyPool,
    dialect: SqlDialect,
    table: &str,
) -> Result<(Option<String>, Vec<String>), PipelineError> {
    let rows = sqlx::query(&dialect.columns_query())
        .bind(table)
        .fetch_all(pool)
        .await?;

    let mut stored_name = None;
    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get(0)?;
        stored_name.get_or_insert(name);
        columns.push(row.try_get::<String, _>(1)?);
    }
    Ok((stored_name, columns))
}

#[async_trait]
impl RecordSource for SqlSource {
    async fn fetch_batch(&self) -> Result<Vec<Sample>, PipelineError> {
        let rows = sqlx::query(&self.dialect.select_samples(&self.table))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let text: TextRow = (row.try_get(0)?, row.try_get(1)?, row.try_get(2)?, row.try_get(3)?);
                sample_from_text(index, text)
            })
            .collect()
    }
}
