//! The service the bootstrap hands its configuration to.
//!
//! [`BotService`] is the seam between startup and the component that
//! owns call signaling and media. [`HostedService`] is the in-tree
//! implementation: it holds the configuration and serves the health and
//! metrics endpoints while the process runs.

use crate::configuration::BotConfiguration;
use crate::errors::BotError;
use crate::observability::{health_router, HealthState};
use async_trait::async_trait;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Lifecycle of the long-lived bot service.
#[async_trait]
pub trait BotService: Send {
    /// Take ownership of the validated configuration.
    async fn initialize(&mut self, config: BotConfiguration) -> Result<(), BotError>;

    /// Begin serving. Called once, after `initialize`.
    async fn start(&mut self) -> Result<(), BotError>;

    /// Stop serving and release resources.
    async fn stop(&mut self) -> Result<(), BotError>;
}

/// Service that exposes health and metrics for the running bot.
#[derive(Debug)]
pub struct HostedService {
    health_bind_address: String,
    health_state: Arc<HealthState>,
    metrics_handle: Option<PrometheusHandle>,
    config: Option<BotConfiguration>,
    shutdown_token: CancellationToken,
    server_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl HostedService {
    pub fn new(health_bind_address: impl Into<String>, health_state: Arc<HealthState>) -> Self {
        Self {
            health_bind_address: health_bind_address.into(),
            health_state,
            metrics_handle: None,
            config: None,
            shutdown_token: CancellationToken::new(),
            server_task: None,
            local_addr: None,
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Configuration received in `initialize`.
    #[must_use]
    pub fn configuration(&self) -> Option<&BotConfiguration> {
        self.config.as_ref()
    }

    /// Address the health server is bound to, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn router(&self) -> Router {
        let router = health_router(Arc::clone(&self.health_state));

        match &self.metrics_handle {
            Some(handle) => {
                let handle = handle.clone();
                let metrics_router = Router::new().route(
                    "/metrics",
                    axum::routing::get(move || {
                        let handle = handle.clone();
                        async move { handle.render() }
                    }),
                );
                router.merge(metrics_router)
            }
            None => router,
        }
    }
}

#[async_trait]
impl BotService for HostedService {
    async fn initialize(&mut self, config: BotConfiguration) -> Result<(), BotError> {
        if self.config.is_some() {
            return Err(BotError::Service("service is already initialized".to_string()));
        }

        let instance = &config.media_platform_settings.instance_settings;
        info!(
            service_cname = %config.service_cname,
            call_control_base_url = %config.call_control_base_url,
            listening_urls = config.call_control_listening_urls.len(),
            place_call_endpoint_configured = config.place_call_endpoint_url.is_some(),
            certificate_thumbprint = %instance.certificate_thumbprint,
            public_address = %SocketAddr::new(instance.instance_public_ip_address, instance.instance_public_port),
            internal_port = instance.instance_internal_port,
            "Service initialized"
        );

        self.config = Some(config);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), BotError> {
        if self.config.is_none() {
            return Err(BotError::Service(
                "service must be initialized before it is started".to_string(),
            ));
        }
        if self.server_task.is_some() {
            return Err(BotError::Service("service is already started".to_string()));
        }

        let addr: SocketAddr = self.health_bind_address.parse().map_err(|e| {
            BotError::Service(format!(
                "Invalid health bind address {}: {e}",
                self.health_bind_address
            ))
        })?;

        // Bind before spawning to fail fast on bind errors
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BotError::Service(format!("Failed to bind health server to {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BotError::Service(format!("Failed to read health server address: {e}")))?;

        let app = self.router();
        let shutdown = self.shutdown_token.child_token();
        let task = tokio::spawn(async move {
            info!(addr = %local_addr, "Health server starting");
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("Health server shutting down");
            });
            if let Err(e) = server.await {
                error!(error = %e, "Health server failed");
            }
        });

        self.server_task = Some(task);
        self.local_addr = Some(local_addr);
        self.health_state.mark_accepting();

        info!(addr = %local_addr, "Service started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BotError> {
        // Stop advertising readiness before tearing anything down
        self.health_state.mark_not_accepting();
        self.shutdown_token.cancel();

        if let Some(task) = self.server_task.take() {
            task.await
                .map_err(|e| BotError::Service(format!("Health server task failed: {e}")))?;
        }

        info!("Service stopped");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::media_platform::{MediaPlatformInstanceSettings, MediaPlatformSettings};
    use common::secret::SecretString;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use url::Url;

    fn test_configuration() -> BotConfiguration {
        BotConfiguration {
            service_dns_name: "bot.example.com".to_string(),
            service_cname: "bot.example.com".to_string(),
            call_control_listening_urls: vec![
                Url::parse("https://bot.example.com:9441/").unwrap(),
                Url::parse("http://bot.example.com:9442/").unwrap(),
            ],
            call_control_base_url: Url::parse("https://bot.example.com/api/calling/notification")
                .unwrap(),
            place_call_endpoint_url: None,
            aad_app_id: "app-id".to_string(),
            aad_app_secret: SecretString::from("secret"),
            media_platform_settings: MediaPlatformSettings {
                instance_settings: MediaPlatformInstanceSettings {
                    certificate_thumbprint: "ABCDEF".to_string(),
                    instance_internal_port: 8445,
                    instance_public_ip_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                    instance_public_port: 14217,
                    service_fqdn: "bot.example.com".to_string(),
                },
                application_id: "app-id".to_string(),
            },
        }
    }

    async fn get_status_line(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr)
            .await
            .expect("connect to health server");
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream
            .write_all(request.as_bytes())
            .await
            .expect("write request");

        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .await
            .expect("read response");
        response.lines().next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_start_requires_initialize() {
        let mut service = HostedService::new("127.0.0.1:0", Arc::new(HealthState::new()));

        let result = service.start().await;
        assert!(matches!(result, Err(BotError::Service(_))));
    }

    #[tokio::test]
    async fn test_initialize_twice_is_rejected() {
        let mut service = HostedService::new("127.0.0.1:0", Arc::new(HealthState::new()));

        service
            .initialize(test_configuration())
            .await
            .expect("first initialize should succeed");
        let second = service.initialize(test_configuration()).await;

        assert!(matches!(second, Err(BotError::Service(_))));
        assert!(service.configuration().is_some());
    }

    #[tokio::test]
    async fn test_invalid_bind_address_fails_start() {
        let mut service = HostedService::new("not-an-address", Arc::new(HealthState::new()));
        service.initialize(test_configuration()).await.unwrap();

        let result = service.start().await;
        assert!(matches!(result, Err(BotError::Service(msg)) if msg.contains("not-an-address")));
    }

    #[tokio::test]
    async fn test_start_serves_health_and_stop_clears_readiness() {
        let health_state = Arc::new(HealthState::new());
        let mut service = HostedService::new("127.0.0.1:0", Arc::clone(&health_state));

        service.initialize(test_configuration()).await.unwrap();
        service.start().await.expect("service should start");

        assert!(health_state.is_accepting_callbacks());
        let addr = service.local_addr().expect("bound address");

        let status = get_status_line(addr, "/ready").await;
        assert!(status.starts_with("HTTP/1.1 200"), "unexpected status: {status}");

        service.stop().await.expect("service should stop");
        assert!(!health_state.is_accepting_callbacks());
    }
}
