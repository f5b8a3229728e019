//! Configuration management for Stalewatch

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix for environment overrides, e.g. `STALEWATCH__RETRY__MAX_ATTEMPTS=5`
pub const ENV_PREFIX: &str = "STALEWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Administrative API configuration
    pub admin: AdminConfig,

    /// Messaging configuration
    pub messaging: MessagingConfig,

    /// Retry configuration for remote calls
    pub retry: RetryConfig,

    /// Delays between remote calls
    pub pacing: PacingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional file, overlaid with environment variables
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Administrative API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Cloud SQL Admin API base URL
    pub sql_admin_url: String,
    /// IAM API base URL
    pub iam_url: String,
    /// Bearer token for both APIs
    pub access_token: Option<String>,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            sql_admin_url: "https://sqladmin.googleapis.com/sql/v1beta4".to_string(),
            iam_url: "https://iam.googleapis.com/v1".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Messaging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Slack Web API base URL
    pub api_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed wait between attempts
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

/// Pacing between remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Wait after each resource before moving to the next one
    #[serde(with = "humantime_serde")]
    pub resource_delay: Duration,
    /// Wait after issuing a backup before reading its operation
    #[serde(with = "humantime_serde")]
    pub settle_interval: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            resource_delay: Duration::from_secs(2),
            settle_interval: Duration::from_secs(3),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, Duration::from_secs(5));
        assert_eq!(config.pacing.resource_delay, Duration::from_secs(2));
        assert_eq!(config.pacing.settle_interval, Duration::from_secs(3));
        assert!(config.admin.access_token.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[retry]
max_attempts = 5
backoff = "250ms"

[admin]
sql_admin_url = "http://localhost:9000/sql/v1beta4"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str()).unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff, Duration::from_millis(250));
        assert_eq!(config.admin.sql_admin_url, "http://localhost:9000/sql/v1beta4");
        // untouched sections keep their defaults
        assert_eq!(config.admin.iam_url, "https://iam.googleapis.com/v1");
        assert_eq!(config.pacing.settle_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load(Some("/nonexistent/stalewatch.toml"));
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
