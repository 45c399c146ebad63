use async_trait::async_trait;
use sqlx::AnyPool;
use tracing::debug;

use super::ResultSink;
use crate::analyzers::types::{AggregateTable, Measure};
use crate::config::WriteMode;
use crate::error::PipelineError;
use crate::sql::{SqlDialect, connect_pool};

/// Writes aggregate tables to a PostgreSQL or MySQL database, one transaction
/// per table.
///
/// MySQL commits DDL implicitly, so there a replace is only atomic from the
/// insert onwards.
pub struct SqlSink {
    pool: AnyPool,
    dialect: SqlDialect,
    mode: WriteMode,
}

impl SqlSink {
    pub async fn connect(dialect: SqlDialect, url: &str, mode: WriteMode) -> Result<Self, PipelineError> {
        let pool = connect_pool(url, "sink").await?;
        Ok(Self {
            pool,
            dialect,
            mode,
        })
    }
}

#[async_trait]
impl ResultSink for SqlSink {
    async fn write_table(&self, table: &AggregateTable) -> Result<(), PipelineError> {
        let dialect = self.dialect;
        let mut tx = self.pool.begin().await?;

        if self.mode == WriteMode::Replace {
            let drop = format!("DROP TABLE IF EXISTS {}", dialect.quote_ident(table.name()));
            sqlx::query(&drop).execute(&mut *tx).await?;
        }
        sqlx::query(&dialect.create_table(table.kind))
            .execute(&mut *tx)
            .await?;

        let first_index: i64 = sqlx::query_scalar(&dialect.next_row_index(table.kind))
            .fetch_one(&mut *tx)
            .await?;

        let insert = dialect.insert_row(table.kind);
        for (offset, row) in table.rows.iter().enumerate() {
            let row_index = first_index + offset as i64;
            let query = sqlx::query(&insert)
                .bind(row_index)
                .bind(row.device_id.as_str())
                .bind(row.hour as i32);
            let query = match row.value {
                Measure::Count(n) => query.bind(i64::try_from(n).map_err(|_| {
                    PipelineError::Storage(format!("count {n} does not fit a BIGINT column"))
                })?),
                Measure::Real(v) => query.bind(v),
            };
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!(table = table.name(), rows = table.rows.len(), first_index, %dialect, "SQL table written");
        Ok(())
    }
}
