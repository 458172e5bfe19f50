//! Configuration loading for the Hexgrid server.
//!
//! Settings come from an optional YAML file (`hexgrid-config.yaml`, or the
//! path in `HEXGRID_CONFIG`) and are then overridden by environment
//! variables:
//!
//! | key | env | default |
//! |-----|-----|---------|
//! | `host` | `HOST` | `0.0.0.0` |
//! | `port` | `PORT` | `7555` |
//! | `master_key` | `MASTER_KEY` | `master-key` |
//! | `idle_timeout_secs` | `IDLE_TIMEOUT_SECS` | `255` |
//! | `data_path` | `DATA_PATH` | `./dataWithStatus.json` |
//! | `codec` | `WIRE_CODEC` | `json` (or `msgpack`) |
//! | `logging.level` | `RUST_LOG` (at subscriber init) | `info` |
//! | `logging.json` | -- | `false` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::codec::WireCodec;

/// Default location of the YAML file.
pub const DEFAULT_CONFIG_PATH: &str = "hexgrid-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is present but unusable.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// The offending key or environment variable.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret granting write access.
    #[serde(default = "default_master_key")]
    pub master_key: String,

    /// Seconds without inbound traffic before a connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Path of the JSON cell dataset.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Wire encoding of envelopes.
    #[serde(default)]
    pub codec: WireCodec,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            master_key: default_master_key(),
            idle_timeout_secs: default_idle_timeout_secs(),
            data_path: default_data_path(),
            codec: WireCodec::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Load from `HEXGRID_CONFIG` (or [`DEFAULT_CONFIG_PATH`]) plus the
    /// process environment. A missing file means defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or if any resulting value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HEXGRID_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a YAML file, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides looked up by environment variable name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric or codec
    /// override does not parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("HOST") {
            self.host = val;
        }
        if let Some(val) = lookup("PORT") {
            self.port = val.parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT",
                reason: format!("{e}"),
            })?;
        }
        if let Some(val) = lookup("MASTER_KEY") {
            self.master_key = val;
        }
        if let Some(val) = lookup("IDLE_TIMEOUT_SECS") {
            self.idle_timeout_secs = val.parse().map_err(|e| ConfigError::InvalidValue {
                key: "IDLE_TIMEOUT_SECS",
                reason: format!("{e}"),
            })?;
        }
        if let Some(val) = lookup("DATA_PATH") {
            self.data_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("WIRE_CODEC") {
            self.codec = val.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "WIRE_CODEC",
                reason,
            })?;
        }
        Ok(())
    }

    /// Reject values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty master key or a
    /// zero idle timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "master_key",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "idle_timeout_secs",
                reason: "must be at least one second".to_owned(),
            });
        }
        Ok(())
    }

    /// The idle timeout as a [`Duration`].
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}
const fn default_port() -> u16 {
    7555
}
fn default_master_key() -> String {
    "master-key".to_owned()
}
const fn default_idle_timeout_secs() -> u64 {
    255
}
fn default_data_path() -> PathBuf {
    PathBuf::from("./dataWithStatus.json")
}
fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 7555);
        assert_eq!(config.idle_timeout(), Duration::from_secs(255));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
host: "127.0.0.1"
port: 9000
master_key: "hunter2"
idle_timeout_secs: 60
data_path: "/srv/hexgrid/cells.json"
codec: msgpack
logging:
  level: "debug"
  json: true
"#;
        let config = ServerConfig::parse(yaml).ok();
        let config = config.unwrap_or_default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.master_key, "hunter2");
        assert_eq!(config.idle_timeout_secs, 60);
        assert_eq!(config.data_path, PathBuf::from("/srv/hexgrid/cells.json"));
        assert_eq!(config.codec, WireCodec::Msgpack);
        assert!(config.logging.json);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = ServerConfig::parse("port: 8000\n").unwrap_or_default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.master_key, "master-key");
        assert_eq!(config.codec, WireCodec::Json);
        assert!(!config.logging.json);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            ServerConfig::parse("port: [not a port"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(env(&[
            ("PORT", "7000"),
            ("MASTER_KEY", "from-env"),
            ("DATA_PATH", "/tmp/cells.json"),
            ("IDLE_TIMEOUT_SECS", "30"),
            ("WIRE_CODEC", "msgpack"),
        ]));
        assert!(result.is_ok());
        assert_eq!(config.port, 7000);
        assert_eq!(config.master_key, "from-env");
        assert_eq!(config.data_path, PathBuf::from("/tmp/cells.json"));
        assert_eq!(config.idle_timeout_secs, 30);
        assert_eq!(config.codec, WireCodec::Msgpack);
    }

    #[test]
    fn unknown_codec_override_is_rejected() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(env(&[("WIRE_CODEC", "cbor")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "WIRE_CODEC", .. })
        ));
    }

    #[test]
    fn non_numeric_port_override_is_rejected() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(env(&[("PORT", "seventy")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "PORT", .. })
        ));
    }

    #[test]
    fn empty_key_and_zero_timeout_are_rejected() {
        let empty_key = ServerConfig {
            master_key: String::new(),
            ..ServerConfig::default()
        };
        assert!(empty_key.validate().is_err());

        let no_timeout = ServerConfig {
            idle_timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert!(no_timeout.validate().is_err());
    }
}
