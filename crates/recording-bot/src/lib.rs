//! Recording Bot Bootstrap Library
//!
//! Everything the recording bot needs before it can accept calls:
//!
//! - Reading deployment settings and rejecting placeholder values
//! - Finding the media certificate in the machine store by thumbprint
//! - Resolving the public address handed to the media platform
//! - Assembling the immutable [`configuration::BotConfiguration`]
//! - Driving the hosted service through its startup state machine
//!
//! # Startup
//!
//! ```text
//! Config::from_env ──► AppSettings ──► ConfigurationLoader::initialize
//!                                             │
//!                      ServiceHost::start ◄───┘
//!                        NotStarted → Initializing → Running | Failed
//! ```
//!
//! # Modules
//!
//! - [`config`] - Process configuration from environment
//! - [`settings`] - App settings sources (TOML file, environment)
//! - [`configuration`] - Validation and assembly of the bot configuration
//! - [`certificates`] - Machine certificate store
//! - [`dns`] - Public hostname resolution
//! - [`connection_limit`] - Process-wide outbound connection limit
//! - [`service`] - Hosted service seam and implementation
//! - [`lifecycle`] - Startup state machine
//! - [`observability`] - Health endpoints and metrics
//! - [`errors`] - Error types

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod certificates;
pub mod config;
pub mod configuration;
pub mod connection_limit;
pub mod dns;
pub mod errors;
pub mod lifecycle;
pub mod media_platform;
pub mod observability;
pub mod service;
pub mod settings;
