//! Configuration management for promdemo
//!
//! Parses an optional TOML file and provides typed access to settings. Every
//! section has defaults, so the server runs with no file at all. The `PORT`
//! environment variable overrides `server.port`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Environment variable selecting the listening port
pub const PORT_ENV: &str = "PORT";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for paths no route claims
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

/// Background disk-usage sampler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplerConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

fn default_interval_seconds() -> u64 {
    5
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load the file if one was given, otherwise use defaults, then apply `PORT`
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_port_override(std::env::var(PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Override `server.port` from a raw `PORT` value
    ///
    /// An unset or empty value keeps the configured port.
    pub fn apply_port_override(&mut self, raw: Option<&str>) -> AppResult<()> {
        let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        self.server.port = raw.parse().map_err(|_| AppError::InvalidPort {
            value: raw.to_string(),
        })?;

        Ok(())
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(AppError::Config("server.host must not be empty".to_string()));
        }

        if self.server.public_dir.as_os_str().is_empty() {
            return Err(AppError::Config(
                "server.public_dir must not be empty".to_string(),
            ));
        }

        if self.sampler.interval_seconds == 0 {
            return Err(AppError::Config(
                "sampler.interval_seconds must be greater than 0".to_string(),
            ));
        }

        let level = self.observability.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(AppError::Config(format!(
                "observability.log_level '{}' is invalid, expected one of {:?}",
                self.observability.log_level, VALID_LOG_LEVELS
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8080
public_dir = "static"

[sampler]
interval_seconds = 10

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_dir, PathBuf::from("static"));
        assert_eq!(config.sampler.interval(), Duration::from_secs(10));
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").expect("empty config is valid");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.public_dir, PathBuf::from("public"));
        assert_eq!(config.sampler.interval_seconds, 5);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_section_fills_missing_fields() {
        let config = Config::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_zero_sampler_interval_fails() {
        let err = Config::from_str("[sampler]\ninterval_seconds = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_seconds"));
    }

    #[test]
    fn test_invalid_log_level_fails() {
        let err = Config::from_str("[observability]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_port_out_of_range_fails_to_parse() {
        let err = Config::from_str("[server]\nport = 70000\n").unwrap_err();
        assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_port_override_replaces_configured_port() {
        let mut config = Config::default();
        config.apply_port_override(Some("8081")).unwrap();
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_missing_or_empty_port_keeps_default() {
        let mut config = Config::default();
        config.apply_port_override(None).unwrap();
        config.apply_port_override(Some("")).unwrap();
        config.apply_port_override(Some("  ")).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_non_numeric_port_is_rejected() {
        let mut config = Config::default();
        let err = config.apply_port_override(Some("http")).unwrap_err();
        assert!(matches!(err, AppError::InvalidPort { ref value } if value == "http"));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).expect("should load file");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigFileRead { .. }));
    }

    #[test]
    fn test_from_file_wraps_validation_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[sampler]\ninterval_seconds = 0\n").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AppError::ConfigValidationFailed { .. }));
    }
}
