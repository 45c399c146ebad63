//! Job configuration, read from the environment.
//!
//! | Variable                 | Default        |
//! |--------------------------|----------------|
//! | `SOURCE_CS`              | required (or `POSTGRESQL_CS`) |
//! | `SINK_CS`                | required (or `MYSQL_CS`)      |
//! | `SOURCE_TABLE`           | `devices`      |
//! | `WRITE_MODE`             | `replace`      |
//! | `DISTANCE_MODEL`         | `great-circle` |
//! | `CONNECT_RETRY_DELAY_MS` | `100`          |
//! | `CONNECT_MAX_ATTEMPTS`   | `600` (0 = unbounded) |
//! | `STARTUP_DELAY_SECS`     | `0`            |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::PipelineError;
use crate::geo::DistanceModel;
use crate::retry::RetryPolicy;
use crate::sql::{SqlDialect, redact_url};

/// Where samples are read from or aggregates written to.
///
/// Parsed from connection strings such as `duckdb:///var/lib/telemetry.duckdb`,
/// `csv://./out`, `s3://bucket/prefix`, `postgresql://user:pw@host/db`,
/// `mysql://user:pw@host/db`, or a bare path ending in `.duckdb`, `.db` or
/// `.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    DuckDb(PathBuf),
    Csv(PathBuf),
    S3 { bucket: String, prefix: String },
    /// A PostgreSQL or MySQL server; `url` is handed to sqlx unchanged.
    Sql { dialect: SqlDialect, url: String },
}

impl FromStr for Endpoint {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(dialect) = SqlDialect::from_url(s) {
            return Ok(Endpoint::Sql {
                dialect,
                url: s.to_string(),
            });
        }
        if let Some(path) = s.strip_prefix("duckdb://") {
            return non_empty_path(s, path).map(Endpoint::DuckDb);
        }
        if let Some(path) = s.strip_prefix("csv://") {
            return non_empty_path(s, path).map(Endpoint::Csv);
        }
        if let Some(rest) = s.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(PipelineError::Config(format!("{s:?} names no bucket")));
            }
            return Ok(Endpoint::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.trim_matches('/').to_string(),
            });
        }

        let lower = s.to_ascii_lowercase();
        if lower.ends_with(".duckdb") || lower.ends_with(".db") {
            Ok(Endpoint::DuckDb(PathBuf::from(s)))
        } else if lower.ends_with(".csv") {
            Ok(Endpoint::Csv(PathBuf::from(s)))
        } else {
            Err(PipelineError::Config(format!(
                "unsupported connection string {s:?}"
            )))
        }
    }
}

fn non_empty_path(cs: &str, path: &str) -> Result<PathBuf, PipelineError> {
    if path.is_empty() {
        Err(PipelineError::Config(format!("{cs:?} names no path")))
    } else {
        Ok(PathBuf::from(path))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::DuckDb(path) => write!(f, "duckdb://{}", path.display()),
            Endpoint::Csv(path) => write!(f, "csv://{}", path.display()),
            Endpoint::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
            Endpoint::Sql { url, .. } => f.write_str(&redact_url(url)),
        }
    }
}

/// What a sink does with a table that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Replace,
    Append,
}

impl FromStr for WriteMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(WriteMode::Replace),
            "append" => Ok(WriteMode::Append),
            other => Err(PipelineError::Config(format!(
                "unknown write mode {other:?} (expected replace or append)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub source: Endpoint,
    pub sink: Endpoint,
    pub source_table: String,
    pub write_mode: WriteMode,
    pub distance_model: DistanceModel,
    pub retry: RetryPolicy,
    pub startup_delay: Duration,
}

impl JobConfig {
    /// Builds a config with defaults for everything but the two endpoints.
    pub fn new(source: Endpoint, sink: Endpoint) -> Self {
        Self {
            source,
            sink,
            source_table: "devices".to_string(),
            write_mode: WriteMode::default(),
            distance_model: DistanceModel::default(),
            retry: RetryPolicy::default(),
            startup_delay: Duration::ZERO,
        }
    }

    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // The second name is the variable the deployed job used for that store.
        let required = |key: &str, fallback: &str| {
            lookup(key)
                .or_else(|| lookup(fallback))
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PipelineError::Config(format!("{key} (or {fallback}) must be set")))
        };

        let mut config = Self::new(
            required("SOURCE_CS", "POSTGRESQL_CS")?.parse()?,
            required("SINK_CS", "MYSQL_CS")?.parse()?,
        );

        if let Some(table) = lookup("SOURCE_TABLE").filter(|t| !t.trim().is_empty()) {
            config.source_table = table.trim().to_string();
        }
        if let Some(mode) = lookup("WRITE_MODE") {
            config.write_mode = mode.parse()?;
        }
        if let Some(model) = lookup("DISTANCE_MODEL") {
            config.distance_model = model.parse()?;
        }
        if let Some(ms) = lookup("CONNECT_RETRY_DELAY_MS") {
            config.retry.delay = Duration::from_millis(parse_number("CONNECT_RETRY_DELAY_MS", &ms)?);
        }
        if let Some(max) = lookup("CONNECT_MAX_ATTEMPTS") {
            config.retry.max_attempts = match parse_number("CONNECT_MAX_ATTEMPTS", &max)? {
                0 => None,
                n => Some(u32::try_from(n).map_err(|_| {
                    PipelineError::Config(format!("CONNECT_MAX_ATTEMPTS {n} is too large"))
                })?),
            };
        }
        if let Some(secs) = lookup("STARTUP_DELAY_SECS") {
            config.startup_delay = Duration::from_secs(parse_number("STARTUP_DELAY_SECS", &secs)?);
        }

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("{key}={value:?} is not a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_endpoint_schemes() {
        assert_eq!(
            "duckdb:///data/telemetry.duckdb".parse::<Endpoint>().unwrap(),
            Endpoint::DuckDb(PathBuf::from("/data/telemetry.duckdb"))
        );
        assert_eq!(
            "csv://out".parse::<Endpoint>().unwrap(),
            Endpoint::Csv(PathBuf::from("out"))
        );
        assert_eq!(
            "s3://analytics/rollups/hourly/".parse::<Endpoint>().unwrap(),
            Endpoint::S3 {
                bucket: "analytics".into(),
                prefix: "rollups/hourly".into()
            }
        );
        assert_eq!(
            "s3://analytics".parse::<Endpoint>().unwrap(),
            Endpoint::S3 {
                bucket: "analytics".into(),
                prefix: String::new()
            }
        );
    }

    #[test]
    fn test_endpoint_bare_paths() {
        assert_eq!(
            "samples.csv".parse::<Endpoint>().unwrap(),
            Endpoint::Csv(PathBuf::from("samples.csv"))
        );
        assert_eq!(
            "./store.db".parse::<Endpoint>().unwrap(),
            Endpoint::DuckDb(PathBuf::from("./store.db"))
        );
        assert!("sqlite://local.db".parse::<Endpoint>().is_err());
        assert!("duckdb://".parse::<Endpoint>().is_err());
        assert!("s3:///prefix".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_endpoint_sql_servers() {
        assert_eq!(
            "postgresql://etl:pw@db:5432/telemetry".parse::<Endpoint>().unwrap(),
            Endpoint::Sql {
                dialect: SqlDialect::Postgres,
                url: "postgresql://etl:pw@db:5432/telemetry".into()
            }
        );
        assert!(matches!(
            "postgres://db/telemetry".parse::<Endpoint>().unwrap(),
            Endpoint::Sql {
                dialect: SqlDialect::Postgres,
                ..
            }
        ));
        assert_eq!(
            "mysql://root:pw@db:3306/analytics".parse::<Endpoint>().unwrap(),
            Endpoint::Sql {
                dialect: SqlDialect::MySql,
                url: "mysql://root:pw@db:3306/analytics".into()
            }
        );
    }

    #[test]
    fn test_sql_endpoint_display_hides_credentials() {
        let endpoint: Endpoint = "mysql://root:hunter2@db:3306/analytics".parse().unwrap();
        assert_eq!(endpoint.to_string(), "mysql://***@db:3306/analytics");
    }

    #[test]
    fn test_deployed_variable_names_are_accepted() {
        let config = JobConfig::from_lookup(lookup(&[
            ("POSTGRESQL_CS", "postgresql://etl:pw@db/telemetry"),
            ("MYSQL_CS", "mysql://etl:pw@db/analytics"),
        ]))
        .unwrap();
        assert!(matches!(
            config.source,
            Endpoint::Sql {
                dialect: SqlDialect::Postgres,
                ..
            }
        ));
        assert!(matches!(
            config.sink,
            Endpoint::Sql {
                dialect: SqlDialect::MySql,
                ..
            }
        ));
    }

    #[test]
    fn test_defaults() {
        let config = JobConfig::from_lookup(lookup(&[
            ("SOURCE_CS", "in.duckdb"),
            ("SINK_CS", "csv://out"),
        ]))
        .unwrap();

        assert_eq!(config.source_table, "devices");
        assert_eq!(config.write_mode, WriteMode::Replace);
        assert_eq!(config.distance_model, DistanceModel::GreatCircle);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.startup_delay, Duration::ZERO);
    }

    #[test]
    fn test_overrides() {
        let config = JobConfig::from_lookup(lookup(&[
            ("SOURCE_CS", "in.duckdb"),
            ("SINK_CS", "out.duckdb"),
            ("SOURCE_TABLE", "readings"),
            ("WRITE_MODE", "append"),
            ("DISTANCE_MODEL", "ellipsoidal"),
            ("CONNECT_RETRY_DELAY_MS", "250"),
            ("CONNECT_MAX_ATTEMPTS", "0"),
            ("STARTUP_DELAY_SECS", "20"),
        ]))
        .unwrap();

        assert_eq!(config.source_table, "readings");
        assert_eq!(config.write_mode, WriteMode::Append);
        assert_eq!(config.distance_model, DistanceModel::Ellipsoidal);
        assert_eq!(config.retry.delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, None);
        assert_eq!(config.startup_delay, Duration::from_secs(20));
    }

    #[test]
    fn test_missing_connection_string() {
        let err = JobConfig::from_lookup(lookup(&[("SOURCE_CS", "in.duckdb")])).unwrap_err();
        assert!(err.to_string().contains("SINK_CS"));
    }

    #[test]
    fn test_invalid_number() {
        let err = JobConfig::from_lookup(lookup(&[
            ("SOURCE_CS", "in.duckdb"),
            ("SINK_CS", "out.duckdb"),
            ("CONNECT_RETRY_DELAY_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
