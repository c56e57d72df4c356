//! Startup state machine.
//!
//! ```text
//! NotStarted -> Initializing -> Running -> Stopped
//!                     |
//!                     +-------> Failed
//! ```
//!
//! `Failed` and `Stopped` are terminal. Any error while loading the
//! configuration or bringing the service up moves the host to `Failed`;
//! the process is expected to exit non-zero afterwards.

use crate::configuration::BotConfiguration;
use crate::errors::BotError;
use crate::observability::metrics::{
    record_config_load_duration, record_startup_failure, set_lifecycle_state,
};
use crate::service::BotService;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Lifecycle state of the bot host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    NotStarted,
    Initializing,
    Running,
    Failed,
    Stopped,
}

impl BotState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BotState::NotStarted => "not_started",
            BotState::Initializing => "initializing",
            BotState::Running => "running",
            BotState::Failed => "failed",
            BotState::Stopped => "stopped",
        }
    }

    /// Value published on the `rb_lifecycle_state` gauge.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            BotState::NotStarted => 0,
            BotState::Initializing => 1,
            BotState::Running => 2,
            BotState::Failed => 3,
            BotState::Stopped => 4,
        }
    }

    const fn can_transition_to(self, next: BotState) -> bool {
        matches!(
            (self, next),
            (BotState::NotStarted, BotState::Initializing)
                | (BotState::Initializing, BotState::Running | BotState::Failed)
                | (BotState::Running, BotState::Stopped)
        )
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives a [`BotService`] through startup and shutdown.
#[derive(Debug)]
pub struct ServiceHost<S> {
    service: S,
    state: BotState,
}

impl<S: BotService> ServiceHost<S> {
    pub fn new(service: S) -> Self {
        set_lifecycle_state(BotState::NotStarted.code());
        Self {
            service,
            state: BotState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> BotState {
        self.state
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Load the configuration, then initialize and start the service.
    ///
    /// `load_configuration` runs on a blocking thread once the host is
    /// `Initializing`. It covers everything from reading the settings
    /// sources to `ConfigurationLoader::initialize`.
    ///
    /// On success the host is `Running`. On any failure the error is
    /// logged, the failure is counted, the host moves to `Failed` and the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// - `BotError::InvalidTransition` if the host was already started
    /// - Any error from `load_configuration` or the service
    #[instrument(skip_all, name = "rb.startup")]
    pub async fn start<F>(&mut self, load_configuration: F) -> Result<(), BotError>
    where
        F: FnOnce() -> Result<BotConfiguration, BotError> + Send + 'static,
    {
        self.transition(BotState::Initializing)?;
        info!("Initializing recording bot");

        match self.initialize_and_start(load_configuration).await {
            Ok(()) => {
                self.transition(BotState::Running)?;
                info!("Recording bot service started");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), key = e.key(), "Exception on startup");
                record_startup_failure(e.kind());
                self.transition(BotState::Failed)?;
                Err(e)
            }
        }
    }

    /// Stop a running service.
    ///
    /// The host is `Stopped` afterwards even if the service reports an
    /// error while stopping.
    ///
    /// # Errors
    ///
    /// - `BotError::InvalidTransition` unless the host is `Running`
    /// - Any error from `BotService::stop`
    pub async fn stop(&mut self) -> Result<(), BotError> {
        if !self.state.can_transition_to(BotState::Stopped) {
            return Err(self.invalid_transition(BotState::Stopped));
        }

        info!("Stopping recording bot service");
        let result = self.service.stop().await;
        self.transition(BotState::Stopped)?;

        if let Err(e) = &result {
            error!(error = %e, "Service reported an error while stopping");
        }
        result
    }

    async fn initialize_and_start<F>(&mut self, load_configuration: F) -> Result<(), BotError>
    where
        F: FnOnce() -> Result<BotConfiguration, BotError> + Send + 'static,
    {
        let started = Instant::now();
        let loaded = tokio::task::spawn_blocking(load_configuration)
            .await
            .map_err(|e| BotError::Internal(format!("Configuration loader task failed: {e}")))?;

        let status = if loaded.is_ok() { "success" } else { "error" };
        record_config_load_duration(status, started.elapsed());

        let config = loaded?;
        self.service.initialize(config).await?;
        self.service.start().await
    }

    fn transition(&mut self, next: BotState) -> Result<(), BotError> {
        if !self.state.can_transition_to(next) {
            return Err(self.invalid_transition(next));
        }

        info!(from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
        set_lifecycle_state(next.code());
        Ok(())
    }

    fn invalid_transition(&self, next: BotState) -> BotError {
        BotError::InvalidTransition {
            from: self.state.as_str(),
            to: next.as_str(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::certificates::{CertificateStore, StoredCertificate};
    use crate::configuration::{ConfigurationLoader, LoaderOptions};
    use crate::dns::HostResolver;
    use crate::settings::{
        AppSettings, AAD_APP_ID_KEY, AAD_APP_SECRET_KEY, CERTIFICATE_THUMBPRINT_KEY,
        INSTANCE_INTERNAL_PORT_KEY, INSTANCE_PUBLIC_PORT_KEY, SERVICE_DNS_NAME_KEY,
    };
    use async_trait::async_trait;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    const THUMBPRINT: &str = "AABBCCDDEEFF00112233445566778899AABBCCDD";

    struct SingleCertificate;

    impl CertificateStore for SingleCertificate {
        fn find_by_thumbprint(
            &self,
            thumbprint: &str,
        ) -> Result<Vec<StoredCertificate>, BotError> {
            if crate::certificates::normalize_thumbprint(thumbprint) == THUMBPRINT {
                Ok(vec![StoredCertificate {
                    thumbprint: THUMBPRINT.to_string(),
                    der: Vec::new(),
                    source: PathBuf::from("/store/bot.pem"),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct Loopback;

    impl HostResolver for Loopback {
        fn resolve(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
            Ok(vec![IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10))])
        }
    }

    #[derive(Default)]
    struct Calls {
        initialize: usize,
        start: usize,
        stop: usize,
        config: Option<BotConfiguration>,
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Arc<Mutex<Calls>>,
        fail_start: bool,
        fail_stop: bool,
    }

    #[async_trait]
    impl BotService for RecordingService {
        async fn initialize(&mut self, config: BotConfiguration) -> Result<(), BotError> {
            let mut calls = self.calls.lock().unwrap();
            calls.initialize += 1;
            calls.config = Some(config);
            Ok(())
        }

        async fn start(&mut self) -> Result<(), BotError> {
            self.calls.lock().unwrap().start += 1;
            if self.fail_start {
                return Err(BotError::Service("listener unavailable".to_string()));
            }
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), BotError> {
            self.calls.lock().unwrap().stop += 1;
            if self.fail_stop {
                return Err(BotError::Service("stop failed".to_string()));
            }
            Ok(())
        }
    }

    fn valid_settings() -> AppSettings {
        AppSettings::default()
            .with(SERVICE_DNS_NAME_KEY, "bot.example.com")
            .with(CERTIFICATE_THUMBPRINT_KEY, THUMBPRINT)
            .with(AAD_APP_ID_KEY, "11111111-2222-3333-4444-555555555555")
            .with(AAD_APP_SECRET_KEY, "s3cret")
            .with(INSTANCE_INTERNAL_PORT_KEY, "8445")
            .with(INSTANCE_PUBLIC_PORT_KEY, "14217")
    }

    fn loader(
        settings: AppSettings,
    ) -> impl FnOnce() -> Result<BotConfiguration, BotError> + Send + 'static {
        move || {
            ConfigurationLoader::new(settings, SingleCertificate, Loopback, LoaderOptions::default())
                .initialize()
        }
    }

    #[test]
    fn test_state_codes_and_names() {
        assert_eq!(BotState::NotStarted.code(), 0);
        assert_eq!(BotState::Running.code(), 2);
        assert_eq!(BotState::Failed.to_string(), "failed");
        assert_eq!(BotState::Stopped.as_str(), "stopped");
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(BotState::NotStarted.can_transition_to(BotState::Initializing));
        assert!(BotState::Initializing.can_transition_to(BotState::Running));
        assert!(BotState::Initializing.can_transition_to(BotState::Failed));
        assert!(BotState::Running.can_transition_to(BotState::Stopped));

        assert!(!BotState::NotStarted.can_transition_to(BotState::Running));
        assert!(!BotState::Failed.can_transition_to(BotState::Initializing));
        assert!(!BotState::Stopped.can_transition_to(BotState::Running));
        assert!(!BotState::Running.can_transition_to(BotState::Initializing));
    }

    #[tokio::test]
    async fn test_successful_startup_reaches_running() {
        let service = RecordingService::default();
        let calls = Arc::clone(&service.calls);
        let mut host = ServiceHost::new(service);
        assert_eq!(host.state(), BotState::NotStarted);

        host.start(loader(valid_settings()))
            .await
            .expect("startup should succeed");

        assert_eq!(host.state(), BotState::Running);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.initialize, 1);
        assert_eq!(calls.start, 1);
        let config = calls.config.as_ref().expect("service received configuration");
        assert_eq!(config.service_cname, "bot.example.com");
        assert_eq!(
            config.media_platform_settings.instance_settings.certificate_thumbprint,
            THUMBPRINT
        );
    }

    #[tokio::test]
    async fn test_config_failure_moves_to_failed_without_touching_service() {
        let service = RecordingService::default();
        let calls = Arc::clone(&service.calls);
        let mut host = ServiceHost::new(service);

        let result = host
            .start(loader(valid_settings().with(AAD_APP_ID_KEY, "%AadAppId%")))
            .await;

        assert!(
            matches!(result, Err(BotError::Config { ref key, .. }) if key == AAD_APP_ID_KEY)
        );
        assert_eq!(host.state(), BotState::Failed);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.initialize, 0);
        assert_eq!(calls.start, 0);
    }

    #[tokio::test]
    async fn test_settings_source_failure_moves_to_failed() {
        let service = RecordingService::default();
        let calls = Arc::clone(&service.calls);
        let mut host = ServiceHost::new(service);

        let result = host
            .start(|| {
                let settings =
                    AppSettings::from_file(std::path::Path::new("/nonexistent/rb/settings.toml"))?;
                loader(settings)()
            })
            .await;

        assert!(matches!(result, Err(BotError::Settings(_))));
        assert_eq!(host.state(), BotState::Failed);
        assert_eq!(calls.lock().unwrap().initialize, 0);
    }

    #[tokio::test]
    async fn test_service_start_failure_moves_to_failed() {
        let service = RecordingService {
            fail_start: true,
            ..RecordingService::default()
        };
        let mut host = ServiceHost::new(service);

        let result = host.start(loader(valid_settings())).await;

        assert!(matches!(result, Err(BotError::Service(_))));
        assert_eq!(host.state(), BotState::Failed);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let mut host = ServiceHost::new(RecordingService::default());
        host.start(loader(valid_settings())).await.unwrap();

        let result = host.start(loader(valid_settings())).await;

        assert!(matches!(
            result,
            Err(BotError::InvalidTransition {
                from: "running",
                to: "initializing"
            })
        ));
        assert_eq!(host.state(), BotState::Running);
    }

    #[tokio::test]
    async fn test_failed_host_cannot_restart() {
        let mut host = ServiceHost::new(RecordingService::default());
        let _ = host
            .start(loader(valid_settings().without(SERVICE_DNS_NAME_KEY)))
            .await;
        assert_eq!(host.state(), BotState::Failed);

        let result = host.start(loader(valid_settings())).await;
        assert!(matches!(result, Err(BotError::InvalidTransition { .. })));
        assert_eq!(host.state(), BotState::Failed);
    }

    #[tokio::test]
    async fn test_stop_requires_running() {
        let mut host = ServiceHost::new(RecordingService::default());

        let result = host.stop().await;

        assert!(matches!(
            result,
            Err(BotError::InvalidTransition {
                from: "not_started",
                to: "stopped"
            })
        ));
        assert_eq!(host.state(), BotState::NotStarted);
    }

    #[tokio::test]
    async fn test_stop_after_running() {
        let service = RecordingService::default();
        let calls = Arc::clone(&service.calls);
        let mut host = ServiceHost::new(service);
        host.start(loader(valid_settings())).await.unwrap();

        host.stop().await.expect("stop should succeed");

        assert_eq!(host.state(), BotState::Stopped);
        assert_eq!(calls.lock().unwrap().stop, 1);
    }

    #[tokio::test]
    async fn test_stop_error_still_stops() {
        let service = RecordingService {
            fail_stop: true,
            ..RecordingService::default()
        };
        let mut host = ServiceHost::new(service);
        host.start(loader(valid_settings())).await.unwrap();

        let result = host.stop().await;

        assert!(matches!(result, Err(BotError::Service(_))));
        assert_eq!(host.state(), BotState::Stopped);
    }
}
