use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use serde::Serialize;

use super::ResultSink;
use crate::analyzers::types::{AggregateTable, TableDocument};
use crate::error::PipelineError;

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await?;

    Ok(())
}

/// Uploads each table as `<prefix>/<table>.json`, replacing any previous run.
pub struct S3Sink {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Sink {
    /// Loads the ambient AWS configuration and checks that the bucket is
    /// reachable. Only network failures are retryable; a missing bucket or
    /// denied access is not.
    pub async fn connect(bucket: &str, prefix: &str) -> Result<Self, PipelineError> {
        let config = aws_config::load_from_env().await;
        let client = aws_sdk_s3::Client::new(&config);

        client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| connect_error(bucket, e))?;

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }
}

fn connect_error<E, R>(bucket: &str, err: SdkError<E, R>) -> PipelineError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let target = format!("sink s3://{bucket}");
    let detail = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            PipelineError::unavailable(target, detail)
        }
        _ => PipelineError::Storage(format!("{target}: {detail}")),
    }
}

/// Object key of a table under `prefix`.
pub fn object_key(prefix: &str, table_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{table_name}.json")
    } else {
        format!("{prefix}/{table_name}.json")
    }
}

#[async_trait]
impl ResultSink for S3Sink {
    async fn write_table(&self, table: &AggregateTable) -> Result<(), PipelineError> {
        let key = object_key(&self.prefix, table.name());
        write_json_to_s3(&self.client, &self.bucket, &key, &TableDocument::from(table))
            .await
            .map_err(|e| PipelineError::Storage(format!("s3://{}/{key}: {e:#}", self.bucket)))
    }
}
