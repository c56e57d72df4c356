//! Common utilities shared across the recording bot crates.

#![warn(clippy::pedantic)]

/// Module for process-wide logging initialization
pub mod logging;

/// Module for secret types that prevent accidental logging
pub mod secret;
