use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{REQUIRED_COLUMNS, RecordSource};
use crate::error::PipelineError;
use crate::sample::Sample;

/// Reads samples from a CSV file whose header names the sample columns.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Checks that the file exists and carries the expected header.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        let target = format!("source {}", path.display());

        tokio::fs::metadata(&path)
            .await
            .map_err(|e| PipelineError::unavailable(target.clone(), e))?;

        let header_path = path.clone();
        let headers = tokio::task::spawn_blocking(move || {
            let mut rdr = csv::Reader::from_path(&header_path)?;
            Ok::<_, csv::Error>(rdr.headers()?.clone())
        })
        .await?
        .map_err(|e| PipelineError::unavailable(target, e))?;

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !headers.iter().any(|h| h.trim() == *required))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Schema(format!(
                "{} lacks column(s) {}",
                path.display(),
                missing.join(", ")
            )));
        }

        Ok(Self { path })
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn fetch_batch(&self) -> Result<Vec<Sample>, PipelineError> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let mut rdr = csv::ReaderBuilder::new()
                .trim(csv::Trim::Headers)
                .from_path(&path)
                .map_err(|e| PipelineError::Storage(format!("{}: {e}", path.display())))?;

            let mut rows = Vec::new();
            for (index, result) in rdr.deserialize().enumerate() {
                let record: Sample = result.map_err(|e| {
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        PipelineError::Storage(e.to_string())
                    } else {
                        PipelineError::malformed(index, "", e)
                    }
                })?;
                rows.push(record);
            }
            Ok::<_, PipelineError>(rows)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "device_id,temperature,location,time\n";

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("samples.csv");
        fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "d1,12.5,\"[{\"\"latitude\"\": \"\"1.5\"\", \"\"longitude\"\": \"\"2\"\"}]\",1700000000\n\
             d2,,[],1700000100\n",
        );

        let batch = CsvSource::open(&path).await.unwrap().fetch_batch().await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].device_id, "d1");
        assert_eq!(batch[0].temperature, Some(12.5));
        assert_eq!(
            batch[0].location,
            r#"[{"latitude": "1.5", "longitude": "2"}]"#
        );
        assert_eq!(batch[1].temperature, None);
    }

    #[tokio::test]
    async fn test_non_numeric_temperature_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "d1,warm,[],1700000000\n");

        let err = CsvSource::open(&path).await.unwrap().fetch_batch().await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvSource::open(dir.path().join("absent.csv")).await.err().unwrap();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        fs::write(&path, "device_id,time\nd1,1700000000\n").unwrap();

        let err = CsvSource::open(&path).await.err().unwrap();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
