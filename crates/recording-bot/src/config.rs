//! Recording bot process configuration.
//!
//! Process-level knobs (where the settings file and certificate store
//! live, debug mode, ports of the bot's own listeners) are loaded from
//! environment variables. The deployment values the bot hands to the
//! calling platform live in [`crate::settings::AppSettings`].

use crate::configuration::{LoaderOptions, DEFAULT_CALL_CONTROL_PORT};
use crate::connection_limit::DEFAULT_CONNECTION_LIMIT;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default machine personal certificate store directory.
pub const DEFAULT_CERT_STORE_PATH: &str = "/etc/recording-bot/certs/my";

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default bot instance ID prefix.
pub const DEFAULT_BOT_ID_PREFIX: &str = "rb";

/// Default log directives when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVES: &str = "recording_bot=debug,tower_http=debug";

/// Recording bot process configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this bot instance.
    pub bot_id: String,

    /// Optional TOML file with an `[appSettings]` table.
    pub settings_file: Option<PathBuf>,

    /// Directory holding the machine personal certificate store.
    pub cert_store_path: PathBuf,

    /// Debug mode: call control listens on `localhost`.
    pub debug_mode: bool,

    /// HTTPS call control port (plain HTTP uses the next one).
    pub call_control_port: u16,

    /// Process-wide outbound connection limit.
    pub connection_limit: usize,

    /// Health endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// Emit JSON log lines.
    pub log_json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let settings_file = vars
            .get("RECORDING_BOT_SETTINGS_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cert_store_path = vars
            .get("RECORDING_BOT_CERT_STORE_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_CERT_STORE_PATH), PathBuf::from);

        let debug_mode = parse_bool(vars, "RECORDING_BOT_DEBUG")?.unwrap_or(false);
        let log_json = parse_bool(vars, "RECORDING_BOT_LOG_JSON")?.unwrap_or(false);

        let call_control_port = match vars.get("RECORDING_BOT_CALL_CONTROL_PORT") {
            None => DEFAULT_CALL_CONTROL_PORT,
            Some(raw) => match raw.trim().parse::<u16>() {
                // The plain-HTTP listener needs port + 1
                Ok(port) if port != 0 && port != u16::MAX => port,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RECORDING_BOT_CALL_CONTROL_PORT".to_string(),
                        reason: format!("'{raw}' must be a port between 1 and 65534"),
                    });
                }
            },
        };

        let connection_limit = match vars.get("RECORDING_BOT_CONNECTION_LIMIT") {
            None => DEFAULT_CONNECTION_LIMIT,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RECORDING_BOT_CONNECTION_LIMIT".to_string(),
                        reason: format!("'{raw}' must be a positive integer"),
                    });
                }
            },
        };

        let health_bind_address = vars
            .get("RECORDING_BOT_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        // Generate bot instance ID
        let bot_id = vars.get("RECORDING_BOT_ID").cloned().unwrap_or_else(|| {
            let hostname = vars
                .get("HOSTNAME")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_BOT_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bot_id,
            settings_file,
            cert_store_path,
            debug_mode,
            call_control_port,
            connection_limit,
            health_bind_address,
            log_json,
        })
    }

    /// Options for the configuration loader.
    #[must_use]
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            debug_mode: self.debug_mode,
            call_control_port: self.call_control_port,
        }
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(None);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}
