//! Process-wide tracing subscriber setup.
//!
//! Every binary installs exactly one subscriber at startup: an
//! `EnvFilter` (honouring `RUST_LOG` when set) plus a `fmt` layer that
//! writes either human-readable or JSON lines.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging options for a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is not set
    /// (e.g. `"recording_bot=debug,tower_http=debug"`).
    pub default_directives: String,

    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl LoggingConfig {
    /// Create a config with the given default directives and plain output.
    #[must_use]
    pub fn new(default_directives: impl Into<String>) -> Self {
        Self {
            default_directives: default_directives.into(),
            json: false,
        }
    }

    /// Switch JSON output on or off.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `LoggingError::Install` if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directives));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| LoggingError::Install(e.to_string()))
}
