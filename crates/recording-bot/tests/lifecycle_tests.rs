//! Startup lifecycle integration tests.
//!
//! Drives `ServiceHost` from configuration load to shutdown with a real
//! certificate store and either the mock or the hosted service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use rb_test_utils::{MockBotService, MockResolver, TestCertificateStore, TestSettings};
use recording_bot::configuration::{BotConfiguration, ConfigurationLoader, LoaderOptions};
use recording_bot::errors::BotError;
use recording_bot::lifecycle::{BotState, ServiceHost};
use recording_bot::observability::HealthState;
use recording_bot::service::HostedService;
use recording_bot::settings::{AppSettings, SERVICE_DNS_NAME_KEY};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const PUBLIC_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10));

fn loader(
    settings: AppSettings,
    certs: &TestCertificateStore,
) -> impl FnOnce() -> Result<BotConfiguration, BotError> + Send + 'static {
    let store = certs.store();
    move || {
        ConfigurationLoader::new(
            settings,
            store,
            MockResolver::returning([PUBLIC_IP]),
            LoaderOptions::default(),
        )
        .initialize()
    }
}

async fn status_line(addr: SocketAddr, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response.lines().next().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_startup_hands_configuration_to_service() {
    let mut certs = TestCertificateStore::new();
    let cert = certs.add_pem("bot.example.com");
    let service = MockBotService::new();
    let calls = service.calls();

    let mut host = ServiceHost::new(service);
    host.start(loader(
        TestSettings::new().with_thumbprint(&cert.thumbprint).build(),
        &certs,
    ))
    .await
    .expect("startup should succeed");

    assert_eq!(host.state(), BotState::Running);
    let calls = calls.lock().unwrap();
    assert_eq!((calls.initialize, calls.start), (1, 1));
    let config = calls.config.as_ref().unwrap();
    assert_eq!(
        config.media_platform_settings.instance_settings.certificate_thumbprint,
        cert.thumbprint
    );
}

#[tokio::test]
async fn test_missing_certificate_fails_startup() {
    let mut certs = TestCertificateStore::new();
    certs.add_pem("bot.example.com");
    let service = MockBotService::new();
    let calls = service.calls();

    let mut host = ServiceHost::new(service);
    let result = host.start(loader(TestSettings::new().build(), &certs)).await;

    assert!(matches!(result, Err(BotError::Certificate { matches: 0, .. })));
    assert_eq!(host.state(), BotState::Failed);
    assert_eq!(calls.lock().unwrap().initialize, 0);
}

#[tokio::test]
async fn test_service_initialize_failure_fails_startup() {
    let mut certs = TestCertificateStore::new();
    let cert = certs.add_pem("bot.example.com");
    let service = MockBotService::new().failing_initialize();
    let calls = service.calls();

    let mut host = ServiceHost::new(service);
    let result = host
        .start(loader(
            TestSettings::new().with_thumbprint(&cert.thumbprint).build(),
            &certs,
        ))
        .await;

    assert!(matches!(result, Err(BotError::Service(_))));
    assert_eq!(host.state(), BotState::Failed);
    // Start is never attempted after a failed initialize
    assert_eq!(calls.lock().unwrap().start, 0);
}

#[tokio::test]
async fn test_missing_dns_name_fails_startup() {
    let certs = TestCertificateStore::new();
    let mut host = ServiceHost::new(MockBotService::new().failing_start());

    let result = host
        .start(loader(
            TestSettings::new().without(SERVICE_DNS_NAME_KEY).build(),
            &certs,
        ))
        .await;

    assert_eq!(result.unwrap_err().key(), Some(SERVICE_DNS_NAME_KEY));
    assert_eq!(host.state(), BotState::Failed);
}

#[tokio::test]
async fn test_hosted_service_serves_readiness_until_stopped() {
    let mut certs = TestCertificateStore::new();
    let cert = certs.add_pem("bot.example.com");
    let health_state = Arc::new(HealthState::new());

    let mut host = ServiceHost::new(HostedService::new(
        "127.0.0.1:0",
        Arc::clone(&health_state),
    ));
    host.start(loader(
        TestSettings::new().with_thumbprint(&cert.thumbprint).build(),
        &certs,
    ))
    .await
    .expect("startup should succeed");

    assert_eq!(host.state(), BotState::Running);
    assert!(host.service().configuration().is_some());

    let addr = host.service().local_addr().expect("health server bound");
    let ready = status_line(addr, "/ready").await;
    assert!(ready.starts_with("HTTP/1.1 200"), "unexpected status: {ready}");
    let live = status_line(addr, "/health").await;
    assert!(live.starts_with("HTTP/1.1 200"), "unexpected status: {live}");

    host.stop().await.expect("stop should succeed");

    assert_eq!(host.state(), BotState::Stopped);
    assert!(!health_state.is_accepting_callbacks());
}

#[tokio::test]
async fn test_hosted_service_not_ready_after_failed_startup() {
    let certs = TestCertificateStore::new();
    let health_state = Arc::new(HealthState::new());

    let mut host = ServiceHost::new(HostedService::new(
        "127.0.0.1:0",
        Arc::clone(&health_state),
    ));
    let result = host.start(loader(TestSettings::new().build(), &certs)).await;

    assert!(result.is_err());
    assert_eq!(host.state(), BotState::Failed);
    assert!(!health_state.is_accepting_callbacks());
    assert!(host.service().local_addr().is_none());
}

#[tokio::test]
async fn test_invalid_settings_file_fails_startup() {
    let certs = TestCertificateStore::new();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[appSettings]\nInstancePublicPort = [1, 2]\n").unwrap();
    let path = file.path().to_path_buf();
    let service = MockBotService::new();
    let calls = service.calls();

    let mut host = ServiceHost::new(service);
    let next = loader(AppSettings::default(), &certs);
    let result = host
        .start(move || {
            AppSettings::from_file(&path)?;
            next()
        })
        .await;

    assert!(matches!(result, Err(BotError::Settings(_))));
    assert_eq!(host.state(), BotState::Failed);
    assert_eq!(calls.lock().unwrap().initialize, 0);
}
