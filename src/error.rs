//! Error taxonomy for the rollup job.

/// Every failure the pipeline can surface. None of them is skipped per record:
/// the run either produces all three tables or none.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The source or sink could not be reached. Retried at startup only.
    #[error("{target} unavailable: {reason}")]
    ConnectionUnavailable { target: String, reason: String },

    /// A sample could not be interpreted.
    #[error("malformed record #{index} (device {device_id:?}): {reason}")]
    MalformedRecord {
        index: usize,
        device_id: String,
        reason: String,
    },

    /// A latitude/longitude pair outside the valid ranges, or not a number.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// The source table exists but does not carry the expected columns.
    #[error("source schema mismatch: {0}")]
    Schema(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn unavailable(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConnectionUnavailable {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(index: usize, device_id: &str, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            index,
            device_id: device_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether a retry loop may try again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionUnavailable { .. })
    }

    /// Bad input data, including coordinates out of range.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::InvalidCoordinate(_)
        )
    }
}

impl From<duckdb::Error> for PipelineError {
    fn from(e: duckdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Storage(format!("task join error: {e}"))
    }
}
