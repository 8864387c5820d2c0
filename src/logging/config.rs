use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Logging settings, read before the rest of the configuration so that
/// configuration errors are themselves logged.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub environment: Environment,
    pub level: LogLevel,
    pub dir: PathBuf,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        let default_level = if environment.is_production() {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };

        let level = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default_level);

        let dir = std::env::var("LOG_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        Self {
            environment,
            level,
            dir,
        }
    }

    /// Directive used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> String {
        format!("studio_backend={},tower_http=debug", self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_default_directive() {
        let cfg = LogConfig {
            environment: Environment::Development,
            level: LogLevel::Warn,
            dir: PathBuf::from("logs"),
        };
        assert_eq!(cfg.default_directive(), "studio_backend=warn,tower_http=debug");
    }
}
