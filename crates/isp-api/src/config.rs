//! # Service Configuration
//!
//! Loaded once at startup from a YAML file (path from `--config` or
//! `ISP_CONFIG`), then adjusted by command-line overrides. Every field has a
//! default, so an absent file yields a runnable in-memory service.
//!
//! ```yaml
//! listen:
//!   host: 0.0.0.0
//!   port: 8080
//! database:
//!   host: localhost
//!   port: 5432
//!   username: isp
//!   password: secret
//!   database: isp
//!   schema: system
//!   maxConnections: 10
//! logLevel: info
//! logFormat: text
//! baseline:
//!   initialAdminUiToken: ""
//! metrics:
//!   enabled: true
//! requestTimeoutSecs: 30
//! ```
//!
//! Without a `database` section the service runs on the in-memory backend.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Command-line arguments of `isp-system-service`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "isp-system-service", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "ISP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override `logLevel`.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Override `listen.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Verbosity accepted by `logLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Error,
    /// Treated as `error`; nothing is logged above it.
    Fatal,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Error | Self::Fatal => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Postgres connection descriptor.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Schema to create and put on the `search_path`; `public` when unset.
    pub schema: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            schema: None,
            max_connections: 10,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseConfig {
    /// The schema name is interpolated into DDL, so it must be a plain
    /// identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(schema) = &self.schema {
            if !is_identifier(schema) {
                return Err(ConfigError::Invalid(format!(
                    "database.schema {schema:?} is not a valid identifier"
                )));
            }
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.maxConnections must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaselineConfig {
    /// Bootstrap token for the `admin` application; empty disables baseline.
    pub initial_admin_ui_token: String,
}

impl fmt::Debug for BaselineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.initial_admin_ui_token.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("BaselineConfig")
            .field("initial_admin_ui_token", &token)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub listen: ListenConfig,
    pub database: Option<DatabaseConfig>,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub baseline: BaselineConfig,
    pub metrics: MetricsConfig,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            database: None,
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            baseline: BaselineConfig::default(),
            metrics: MetricsConfig::default(),
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Read the file named by `cli.config` (defaults when absent), apply the
    /// command-line overrides, and validate.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(level) = cli.log_level {
            config.log_level = level;
        }
        if let Some(port) = cli.port {
            config.listen.port = port;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as a mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(db) = &self.database {
            db.validate()?;
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "requestTimeoutSecs must be positive".into(),
            ));
        }
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.listen.host, self.listen.port)
            .parse()
            .map_err(|e| {
                ConfigError::Invalid(format!(
                    "listen address {}:{}: {e}",
                    self.listen.host, self.listen.port
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.database.is_none());
        assert!(config.metrics.enabled);
        assert_eq!(config.listen.port, 8080);
    }

    #[test]
    fn full_document_parses_camel_case() {
        let config = AppConfig::from_yaml(
            r#"
listen:
  host: 127.0.0.1
  port: 9000
database:
  host: db
  port: 6432
  username: isp
  password: hunter2
  database: isp
  schema: system
  maxConnections: 4
logLevel: fatal
logFormat: json
baseline:
  initialAdminUiToken: T
metrics:
  enabled: false
requestTimeoutSecs: 5
"#,
        )
        .unwrap();
        let db = config.database.clone().unwrap();
        assert_eq!(db.port, 6432);
        assert_eq!(db.schema.as_deref(), Some("system"));
        assert_eq!(db.max_connections, 4);
        assert_eq!(config.log_level, LogLevel::Fatal);
        assert_eq!(config.log_level.as_filter(), "error");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.baseline.initial_admin_ui_token, "T");
        assert!(!config.metrics.enabled);
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:9000");
        config.validate().unwrap();
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(AppConfig::from_yaml("logLevel: verbose").is_err());
    }

    #[test]
    fn schema_must_be_an_identifier() {
        let mut db = DatabaseConfig::default();
        db.schema = Some("system; DROP TABLE token".into());
        assert!(matches!(db.validate(), Err(ConfigError::Invalid(_))));
        db.schema = Some("_isp2".into());
        assert!(db.validate().is_ok());
        db.schema = Some("2isp".into());
        assert!(db.validate().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.database = Some(DatabaseConfig {
            password: "hunter2".into(),
            ..DatabaseConfig::default()
        });
        config.baseline.initial_admin_ui_token = "bootstrap-secret".into();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("bootstrap-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn cli_overrides_apply() {
        let cli = Cli {
            config: None,
            log_level: Some(LogLevel::Debug),
            port: Some(7070),
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.listen.port, 7070);
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let config = AppConfig {
            request_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/isp.yaml")),
            ..Cli::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/isp.yaml"));
    }
}
