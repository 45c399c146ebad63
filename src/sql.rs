//! PostgreSQL and MySQL access through sqlx's `Any` driver.
//!
//! The two servers share one code path; [`SqlDialect`] covers the spots where
//! their SQL differs (identifier quoting, bind placeholders, cast targets).

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::fmt;
use std::time::Duration;

use crate::analyzers::types::TableKind;
use crate::error::PipelineError;

/// How long one connection attempt may take before it counts as failed.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    MySql,
}

impl SqlDialect {
    /// Dialect for a connection string, judged by its scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once("://")?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(SqlDialect::Postgres),
            "mysql" => Some(SqlDialect::MySql),
            _ => None,
        }
    }

    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            SqlDialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
            SqlDialect::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }

    /// Bind placeholder for the 1-based parameter `n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${n}"),
            SqlDialect::MySql => "?".to_string(),
        }
    }

    /// `CAST(expr AS <type>)` target yielding text.
    fn text_type(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "TEXT",
            SqlDialect::MySql => "CHAR",
        }
    }

    /// `CAST(expr AS <type>)` target yielding a 64-bit integer.
    fn bigint_type(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "BIGINT",
            SqlDialect::MySql => "SIGNED",
        }
    }

    fn current_schema(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "current_schema()",
            SqlDialect::MySql => "DATABASE()",
        }
    }

    pub fn cast_text(&self, expr: &str) -> String {
        format!("CAST({expr} AS {})", self.text_type())
    }

    /// Stored table name and column names of a table in the connection's
    /// default schema, matched case-insensitively, in declaration order.
    /// Binds the table name once.
    pub fn columns_query(&self) -> String {
        format!(
            "SELECT {}, {} FROM information_schema.columns
             WHERE lower(table_name) = lower({}) AND table_schema = {}
             ORDER BY ordinal_position",
            self.cast_text("table_name"),
            self.cast_text("column_name"),
            self.cast_text(&self.placeholder(1)),
            self.current_schema()
        )
    }

    /// Reads the sample columns of `table`, each cast to text.
    pub fn select_samples(&self, table: &str) -> String {
        let columns: Vec<String> = ["device_id", "time", "temperature", "location"]
            .iter()
            .map(|c| self.cast_text(&self.quote_ident(c)))
            .collect();
        format!("SELECT {} FROM {}", columns.join(", "), self.quote_ident(table))
    }

    pub fn create_table(&self, kind: TableKind) -> String {
        let value_type = match kind {
            TableKind::SampleCount => "BIGINT",
            TableKind::MaxTemperature | TableKind::Distance => "DOUBLE PRECISION",
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                {} BIGINT NOT NULL,
                {} VARCHAR(255) NOT NULL,
                {} INTEGER NOT NULL,
                {} {value_type} NOT NULL
            )",
            self.quote_ident(kind.table_name()),
            self.quote_ident("row_index"),
            self.quote_ident("device_id"),
            self.quote_ident("hour"),
            self.quote_ident(kind.value_column()),
        )
    }

    /// First free `row_index` of the table: 0 when empty.
    pub fn next_row_index(&self, kind: TableKind) -> String {
        format!(
            "SELECT CAST(COALESCE(MAX({}) + 1, 0) AS {}) FROM {}",
            self.quote_ident("row_index"),
            self.bigint_type(),
            self.quote_ident(kind.table_name())
        )
    }

    pub fn insert_row(&self, kind: TableKind) -> String {
        format!(
            "INSERT INTO {} ({}, {}, {}, {}) VALUES ({}, {}, {}, {})",
            self.quote_ident(kind.table_name()),
            self.quote_ident("row_index"),
            self.quote_ident("device_id"),
            self.quote_ident("hour"),
            self.quote_ident(kind.value_column()),
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3),
            self.placeholder(4),
        )
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Postgres => f.write_str("postgres"),
            SqlDialect::MySql => f.write_str("mysql"),
        }
    }
}

/// Hides the user-info part of a connection string.
pub fn redact_url(url: &str) -> String {
    match (url.split_once("://"), url.rfind('@')) {
        (Some((scheme, _)), Some(at)) if at > scheme.len() => {
            format!("{scheme}://***{}", &url[at..])
        }
        _ => url.to_string(),
    }
}

/// Opens a small pool. Any failure to reach the server is reported as
/// [`PipelineError::ConnectionUnavailable`].
pub async fn connect_pool(url: &str, target: &str) -> Result<AnyPool, PipelineError> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await
        .map_err(|e| PipelineError::unavailable(format!("{target} {}", redact_url(url)), e))
}
