//! Process-wide outbound connection limit.
//!
//! Installed once during startup and read by anything that opens outbound
//! connections. Reads before installation see the default.

use crate::errors::BotError;
use std::sync::OnceLock;

/// Default maximum concurrent outbound connections per endpoint.
pub const DEFAULT_CONNECTION_LIMIT: usize = 12;

/// A set-once connection limit.
#[derive(Debug, Default)]
pub struct ConnectionLimit {
    limit: OnceLock<usize>,
}

impl ConnectionLimit {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: OnceLock::new(),
        }
    }

    /// Install the limit. Fails on zero or if a limit is already installed.
    pub fn install(&self, limit: usize) -> Result<(), BotError> {
        if limit == 0 {
            return Err(BotError::config(
                "connection_limit",
                "the outbound connection limit must be at least 1",
            ));
        }

        self.limit.set(limit).map_err(|_| {
            BotError::Internal(format!(
                "outbound connection limit already installed ({})",
                self.get()
            ))
        })
    }

    /// Installed limit, or [`DEFAULT_CONNECTION_LIMIT`].
    #[must_use]
    pub fn get(&self) -> usize {
        self.limit.get().copied().unwrap_or(DEFAULT_CONNECTION_LIMIT)
    }

    /// True once a limit has been installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.limit.get().is_some()
    }
}

static GLOBAL_CONNECTION_LIMIT: ConnectionLimit = ConnectionLimit::new();

/// Install the process-wide outbound connection limit.
///
/// # Errors
///
/// Returns an error for a zero limit or a second installation.
pub fn set_default_connection_limit(limit: usize) -> Result<(), BotError> {
    GLOBAL_CONNECTION_LIMIT.install(limit)?;
    crate::observability::metrics::set_outbound_connection_limit(limit);
    Ok(())
}

/// The process-wide outbound connection limit.
#[must_use]
pub fn default_connection_limit() -> usize {
    GLOBAL_CONNECTION_LIMIT.get()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_before_install() {
        let limit = ConnectionLimit::new();
        assert!(!limit.is_installed());
        assert_eq!(limit.get(), DEFAULT_CONNECTION_LIMIT);
    }

    #[test]
    fn test_install_once() {
        let limit = ConnectionLimit::new();
        limit.install(32).expect("first install should succeed");

        assert!(limit.is_installed());
        assert_eq!(limit.get(), 32);

        let second = limit.install(64);
        assert!(matches!(second, Err(BotError::Internal(_))));
        assert_eq!(limit.get(), 32, "second install must not change the limit");
    }

    #[test]
    fn test_zero_rejected() {
        let limit = ConnectionLimit::new();
        let result = limit.install(0);

        assert!(matches!(result, Err(BotError::Config { .. })));
        assert!(!limit.is_installed());
    }

    #[test]
    fn test_process_wide_limit() {
        // Only test that touches the global
        assert_eq!(default_connection_limit(), DEFAULT_CONNECTION_LIMIT);

        set_default_connection_limit(20).expect("first install should succeed");
        assert_eq!(default_connection_limit(), 20);

        assert!(set_default_connection_limit(40).is_err());
        assert_eq!(default_connection_limit(), 20);
    }
}
