//! Structured logging setup.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing_subscriber::EnvFilter;

/// Crates whose logs the default filter covers.
const ENGINE_TARGETS: &[&str] = &["zenpii_commerce", "zenpii_data", "zenpii_cache", "zenpii"];

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LoggingError::UnknownLevel(other.to_string())),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    Json,
    /// Human-readable format (for development).
    #[default]
    Human,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("A global subscriber is already installed")]
    AlreadyInstalled,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level applied to the engine crates.
    pub level: LogLevel,
    pub format: LogFormat,
    /// Extra `target=level` directives, e.g. `reqwest=debug`.
    pub directives: Vec<String>,
}

impl LoggingConfig {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self {
            level,
            format,
            directives: Vec::new(),
        }
    }

    /// Filter string built from the config.
    pub fn default_directive(&self) -> String {
        let mut parts: Vec<String> = vec!["warn".to_string()];
        parts.extend(
            ENGINE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, self.level.as_str())),
        );
        parts.extend(self.directives.iter().cloned());
        parts.join(",")
    }

    /// `RUST_LOG` wins over the configured directives when set.
    pub fn filter_directive(&self, rust_log: Option<&str>) -> String {
        rust_log
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_directive())
    }
}

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = config.filter_directive(rust_log.as_deref());
    let filter =
        EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Human => builder.try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_engine_crates() {
        let config = LoggingConfig::new(LogLevel::Debug, LogFormat::Json);
        let directive = config.default_directive();
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("zenpii_commerce=debug"));
        assert!(directive.contains("zenpii_data=debug"));
    }

    #[test]
    fn test_rust_log_overrides() {
        let mut config = LoggingConfig::default();
        config.directives.push("reqwest=debug".into());
        assert_eq!(config.filter_directive(Some("trace")), "trace");
        assert!(config.filter_directive(Some("  ")).ends_with("reqwest=debug"));
        assert!(config.filter_directive(None).contains("zenpii_cache=info"));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Debug < LogLevel::Error);
    }

    #[test]
    fn test_config_from_json() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format": "json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn test_directives_parse() {
        let mut config = LoggingConfig::default();
        assert!(EnvFilter::try_new(config.default_directive()).is_ok());
        config.directives.push("zenpii=notalevel".into());
        assert!(EnvFilter::try_new(config.default_directive()).is_err());
    }
}
