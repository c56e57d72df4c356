//! Recording Bot
//!
//! Bootstrap for the compliance recording bot.
//!
//! # Startup Flow
//!
//! 1. Load process configuration from environment and install tracing
//! 2. Install the outbound connection limit (default 12)
//! 3. Initialize Prometheus metrics recorder
//! 4. Start the service host, which reads app settings (optional TOML
//!    file, overlaid by environment), loads and validates the bot
//!    configuration, then initializes and starts the hosted service
//! 5. Wait for shutdown signal, then stop the service
//!
//! Any startup failure is logged and the process exits non-zero.

#![warn(clippy::pedantic)]

use std::sync::Arc;

use common::logging::{init_tracing, LoggingConfig};
use recording_bot::certificates::PemDirectoryStore;
use recording_bot::config::{Config, DEFAULT_LOG_DIRECTIVES};
use recording_bot::configuration::ConfigurationLoader;
use recording_bot::connection_limit::{default_connection_limit, set_default_connection_limit};
use recording_bot::dns::SystemResolver;
use recording_bot::errors::BotError;
use recording_bot::lifecycle::ServiceHost;
use recording_bot::observability::{init_metrics_recorder, HealthState};
use recording_bot::service::HostedService;
use recording_bot::settings::AppSettings;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration decides the log format, so its error is reported after
    // tracing is up
    let config = Config::from_env();
    let log_json = config.as_ref().is_ok_and(|c| c.log_json);
    init_tracing(&LoggingConfig::new(DEFAULT_LOG_DIRECTIVES).with_json(log_json))?;

    info!("Starting Recording Bot");

    let config = config.map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        bot_id = %config.bot_id,
        settings_file = ?config.settings_file,
        cert_store_path = %config.cert_store_path.display(),
        debug_mode = config.debug_mode,
        call_control_port = config.call_control_port,
        connection_limit = config.connection_limit,
        health_bind_address = %config.health_bind_address,
        "Configuration loaded successfully"
    );

    set_default_connection_limit(config.connection_limit).map_err(|e| {
        error!(error = %e, "Failed to set outbound connection limit");
        e
    })?;
    info!(limit = default_connection_limit(), "Outbound connection limit installed");

    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let health_state = Arc::new(HealthState::new());
    let service = HostedService::new(config.health_bind_address.clone(), health_state)
        .with_metrics(prometheus_handle);
    let mut host = ServiceHost::new(service);

    // Settings are read inside startup so a bad file also ends in Failed
    let startup_config = config.clone();
    host.start(move || {
        let settings = load_app_settings(&startup_config)?;
        info!(count = settings.len(), "App settings read");

        ConfigurationLoader::new(
            settings,
            PemDirectoryStore::new(startup_config.cert_store_path.clone()),
            SystemResolver,
            startup_config.loader_options(),
        )
        .initialize()
    })
    .await?;

    info!(state = %host.state(), "Recording Bot ready");

    shutdown_signal().await;
    info!("Shutdown signal received");

    host.stop().await?;

    info!("Recording Bot shutdown complete");
    Ok(())
}

/// Settings file first, then environment variables of the same names.
fn load_app_settings(config: &Config) -> Result<AppSettings, BotError> {
    let from_file = match &config.settings_file {
        Some(path) => {
            info!(path = %path.display(), "Reading settings file");
            AppSettings::from_file(path)?
        }
        None => AppSettings::default(),
    };

    Ok(from_file.overlay(AppSettings::from_env()))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
