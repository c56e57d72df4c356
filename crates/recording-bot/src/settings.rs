//! Application settings source.
//!
//! The deployment hands the bot a flat key/value set (`AadAppId`,
//! `ServiceDNSName`, ...). Values come from an optional TOML file with an
//! `[appSettings]` table, overlaid by environment variables of the same
//! name. Only the known keys are kept.

use crate::errors::BotError;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default call control endpoint name.
pub const DEFAULT_ENDPOINT_KEY: &str = "DefaultEndpoint";

/// AAD application id.
pub const AAD_APP_ID_KEY: &str = "AadAppId";

/// AAD application secret.
pub const AAD_APP_SECRET_KEY: &str = "AadAppSecret";

/// Thumbprint of the certificate in the machine store.
pub const CERTIFICATE_THUMBPRINT_KEY: &str = "CertificateThumbprint";

/// Media platform internal port.
pub const INSTANCE_INTERNAL_PORT_KEY: &str = "InstanceInternalPort";

/// Media platform public port.
pub const INSTANCE_PUBLIC_PORT_KEY: &str = "InstancePublicPort";

/// Optional outbound place-call endpoint.
pub const PLACE_CALL_ENDPOINT_URL_KEY: &str = "PlaceCallEndpointUrl";

/// Media control endpoint name.
pub const INSTANCE_MEDIA_CONTROL_ENDPOINT_KEY: &str = "InstanceMediaControlEndpoint";

/// Service DNS name.
pub const SERVICE_DNS_NAME_KEY: &str = "ServiceDNSName";

/// Service CNAME.
pub const SERVICE_CNAME_KEY: &str = "ServiceCNAME";

/// Every key the bot reads.
pub const KNOWN_KEYS: [&str; 10] = [
    DEFAULT_ENDPOINT_KEY,
    AAD_APP_ID_KEY,
    AAD_APP_SECRET_KEY,
    CERTIFICATE_THUMBPRINT_KEY,
    INSTANCE_INTERNAL_PORT_KEY,
    INSTANCE_PUBLIC_PORT_KEY,
    PLACE_CALL_ENDPOINT_URL_KEY,
    INSTANCE_MEDIA_CONTROL_ENDPOINT_KEY,
    SERVICE_DNS_NAME_KEY,
    SERVICE_CNAME_KEY,
];

/// Key/value settings handed to the configuration loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSettings {
    values: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(rename = "appSettings", default)]
    app_settings: HashMap<String, toml::Value>,
}

impl AppSettings {
    /// Load the known keys from environment variables of the same name.
    pub fn from_env() -> Self {
        Self::from_vars(&env::vars().collect())
    }

    /// Load the known keys from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let values = KNOWN_KEYS
            .iter()
            .filter_map(|key| vars.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect();

        Self { values }
    }

    /// Parse the `[appSettings]` table of a TOML document.
    ///
    /// Strings are taken verbatim; integers and booleans are stringified.
    /// Unknown keys are ignored.
    pub fn from_toml_str(content: &str) -> Result<Self, BotError> {
        let file: SettingsFile = toml::from_str(content)
            .map_err(|e| BotError::Settings(format!("Invalid settings file: {e}")))?;

        let mut values = HashMap::new();
        for (key, value) in file.app_settings {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::debug!(key = %key, "Ignoring unknown app setting");
                continue;
            }

            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(BotError::Settings(format!(
                        "Setting '{key}' must be a string, integer or boolean, got {}",
                        other.type_str()
                    )));
                }
            };
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    /// Read and parse a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self, BotError> {
        let content = fs::read_to_string(path).map_err(|e| {
            BotError::Settings(format!(
                "Failed to read settings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Union of both sources; values in `overrides` win.
    #[must_use]
    pub fn overlay(mut self, overrides: AppSettings) -> Self {
        self.values.extend(overrides.values);
        self
    }

    /// Insert or replace a value.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Remove a value.
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    /// Look up a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of values present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no value is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
