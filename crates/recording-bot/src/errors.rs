//! Recording bot error types.
//!
//! Every startup error is fatal: it is logged with full detail and
//! propagated out of `main`. `BotError::kind` gives a bounded label for
//! the startup failure metric.

use thiserror::Error;

/// Recording bot error type.
///
/// Kinds (metric label in parentheses):
/// - configuration value or settings source (`config`)
/// - certificate lookup or store access (`certificate`)
/// - hostname resolution (`dns`)
/// - service initialization, lifecycle or anything unexpected (`service`)
#[derive(Debug, Error)]
pub enum BotError {
    /// A required configuration value is missing, a placeholder, or malformed.
    #[error("Configuration error for '{key}': {reason}")]
    Config { key: String, reason: String },

    /// The settings source itself could not be read or parsed.
    #[error("Settings source error: {0}")]
    Settings(String),

    /// Thumbprint lookup did not find exactly one certificate.
    #[error(
        "Certificate lookup for '{key}' failed: expected exactly one certificate with thumbprint {thumbprint} in the machine store, found {matches}"
    )]
    Certificate {
        key: String,
        thumbprint: String,
        matches: usize,
    },

    /// The certificate store could not be opened or read.
    #[error("Certificate store error: {0}")]
    CertificateStore(String),

    /// The public hostname did not resolve to any address.
    #[error("Could not resolve the public hostname '{host}': {reason}")]
    Dns { host: String, reason: String },

    /// The hosted service failed to initialize, start or stop.
    #[error("Service error: {0}")]
    Service(String),

    /// Lifecycle transition not allowed from the current state.
    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Build a configuration error for `key`.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        BotError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the bounded metric label for this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Config { .. } | BotError::Settings(_) => "config",
            BotError::Certificate { .. } | BotError::CertificateStore(_) => "certificate",
            BotError::Dns { .. } => "dns",
            BotError::Service(_) | BotError::InvalidTransition { .. } | BotError::Internal(_) => {
                "service"
            }
        }
    }

    /// Returns the configuration key this error is about, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            BotError::Config { key, .. } | BotError::Certificate { key, .. } => Some(key),
            _ => None,
        }
    }
}
