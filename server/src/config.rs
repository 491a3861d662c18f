//! Server configuration, loaded from environment variables.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

pub const DEFAULT_BOARD_DIR: &str = "./boards";

/// Per-connection outbound queue length.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// The browser client's dev server.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,

    /// Directory holding saved boards.
    pub board_dir: PathBuf,

    /// JSON-lines activity file. When unset activities only go to the log.
    pub activity_log: Option<PathBuf>,

    pub connection_buffer: usize,

    /// Auto-reject join requests the creator has not answered in time.
    /// Unset means requests wait until answered or the requester leaves.
    pub join_request_timeout: Option<Duration>,

    pub allowed_origin: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid connection buffer configuration: {0}")]
    InvalidConnectionBuffer(String),

    #[error("Invalid join request timeout configuration: {0}")]
    InvalidJoinRequestTimeout(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            board_dir: PathBuf::from(DEFAULT_BOARD_DIR),
            activity_log: None,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
            join_request_timeout: None,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_address = vars
            .get("BOARD_BIND_ADDRESS")
            .cloned()
            .unwrap_or(defaults.bind_address);

        let board_dir = vars
            .get("BOARD_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.board_dir);

        let activity_log = vars
            .get("BOARD_ACTIVITY_LOG")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let connection_buffer = match vars.get("BOARD_CONNECTION_BUFFER") {
            Some(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidConnectionBuffer(format!("{:?}: {}", value, e))
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidConnectionBuffer(
                        "must be greater than 0".to_string(),
                    ));
                }
                parsed
            }
            None => defaults.connection_buffer,
        };

        let join_request_timeout = match vars.get("BOARD_JOIN_REQUEST_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidJoinRequestTimeout(format!("{:?}: {}", value, e))
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidJoinRequestTimeout(
                        "must be greater than 0".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let allowed_origin = vars
            .get("BOARD_ALLOWED_ORIGIN")
            .cloned()
            .unwrap_or(defaults.allowed_origin);

        Ok(Self {
            bind_address,
            board_dir,
            activity_log,
            connection_buffer,
            join_request_timeout,
            allowed_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn it_uses_defaults() {
        assert_eq!(Config::from_vars(&vars(&[])), Ok(Config::default()));
    }

    #[test]
    fn it_reads_overrides() {
        let config = Config::from_vars(&vars(&[
            ("BOARD_BIND_ADDRESS", "0.0.0.0:9000"),
            ("BOARD_STORE_DIR", "/var/lib/boards"),
            ("BOARD_ACTIVITY_LOG", "/var/log/activity.jsonl"),
            ("BOARD_CONNECTION_BUFFER", "8"),
            ("BOARD_JOIN_REQUEST_TIMEOUT_SECS", "30"),
        ]))
        .expect("valid config");

        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.board_dir, PathBuf::from("/var/lib/boards"));
        assert_eq!(
            config.activity_log,
            Some(PathBuf::from("/var/log/activity.jsonl"))
        );
        assert_eq!(config.connection_buffer, 8);
        assert_eq!(config.join_request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn it_rejects_zero_buffer() {
        assert!(matches!(
            Config::from_vars(&vars(&[("BOARD_CONNECTION_BUFFER", "0")])),
            Err(ConfigError::InvalidConnectionBuffer(_))
        ));
    }

    #[test]
    fn it_rejects_unparsable_timeout() {
        assert!(matches!(
            Config::from_vars(&vars(&[("BOARD_JOIN_REQUEST_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidJoinRequestTimeout(_))
        ));
    }
}
