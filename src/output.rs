//! Log rendering of aggregate tables, used by dry runs.

use anyhow::Result;
use tracing::{debug, info};

use crate::analyzers::types::{AggregateTable, TableDocument};

/// Logs a table using Rust's debug pretty-print format.
pub fn print_pretty(table: &AggregateTable) {
    debug!("{:#?}", table);
}

/// Renders a table as pretty-printed JSON.
pub fn render_json(table: &AggregateTable) -> Result<String> {
    Ok(serde_json::to_string_pretty(&TableDocument::from(table))?)
}

/// Logs a table as pretty-printed JSON.
pub fn print_json(table: &AggregateTable) -> Result<()> {
    info!(table = table.name(), "{}", render_json(table)?);
    Ok(())
}
