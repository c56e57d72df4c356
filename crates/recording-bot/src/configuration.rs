//! Bot configuration loader.
//!
//! Turns the flat app settings into the immutable [`BotConfiguration`]
//! consumed by the service: validates every value, looks up the media
//! certificate by thumbprint and resolves the public address.
//!
//! # Validation
//!
//! Most keys ship with a placeholder (e.g. `%AadAppId%`) that the
//! deployment is expected to replace. A required key that is missing,
//! blank, or still equal to its placeholder fails the whole load with a
//! [`BotError::Config`] naming the key. Optional keys resolve to `None`
//! instead.
//!
//! Every value is logged as it is read, before validation, so a failed
//! startup shows what the bot actually saw. The AAD secret is redacted.

use crate::certificates::{CertificateStore, StoredCertificate};
use crate::dns::{dedup_preserving_order, HostResolver};
use crate::errors::BotError;
use crate::media_platform::{MediaPlatformInstanceSettings, MediaPlatformSettings};
use crate::settings::{
    AppSettings, AAD_APP_ID_KEY, AAD_APP_SECRET_KEY, CERTIFICATE_THUMBPRINT_KEY,
    DEFAULT_ENDPOINT_KEY, INSTANCE_INTERNAL_PORT_KEY, INSTANCE_MEDIA_CONTROL_ENDPOINT_KEY,
    INSTANCE_PUBLIC_PORT_KEY, PLACE_CALL_ENDPOINT_URL_KEY, SERVICE_CNAME_KEY,
    SERVICE_DNS_NAME_KEY,
};
use common::secret::SecretString;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info};
use url::Url;

/// Route prefix for call signaling callbacks.
pub const CALL_SIGNALING_ROUTE_PREFIX: &str = "api/calling";

/// Route for platform notifications under the signaling prefix.
pub const ON_NOTIFICATION_REQUEST_ROUTE: &str = "notification";

/// Placeholder shipped for `AadAppId`.
pub const DEFAULT_AAD_APP_ID_VALUE: &str = "%AadAppId%";

/// Placeholder shipped for `AadAppSecret`.
pub const DEFAULT_AAD_APP_SECRET_VALUE: &str = "%AadAppSecret%";

/// Placeholder shipped for `InstancePublicPort`.
pub const DEFAULT_INSTANCE_PUBLIC_PORT_VALUE: &str = "%PublicTCPPort%";

/// Placeholder shipped for `ServiceCNAME`.
pub const DEFAULT_SERVICE_CNAME_VALUE: &str = "%CName%";

/// Placeholder shipped for `ServiceDNSName`.
pub const DEFAULT_SERVICE_DNS_NAME_VALUE: &str = "%ServiceDns%";

/// Local port of the call control endpoint; the plain-HTTP listener takes
/// the next port.
pub const DEFAULT_CALL_CONTROL_PORT: u16 = 9441;

/// Domain used for listeners and resolution in debug mode.
pub const DEBUG_BASE_DOMAIN: &str = "localhost";

const VALUE_NOT_SET: &str =
    "The configuration value is missing, empty or still set to its placeholder";

/// Validated configuration for the recording bot.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct BotConfiguration {
    /// Service DNS name.
    pub service_dns_name: String,

    /// Service CNAME (falls back to the DNS name).
    pub service_cname: String,

    /// Addresses the call control listeners bind to.
    pub call_control_listening_urls: Vec<Url>,

    /// Callback URL registered with the calling platform.
    pub call_control_base_url: Url,

    /// Optional endpoint for outbound calls.
    pub place_call_endpoint_url: Option<Url>,

    /// AAD application id.
    pub aad_app_id: String,

    /// AAD application secret.
    pub aad_app_secret: SecretString,

    /// Media platform settings.
    pub media_platform_settings: MediaPlatformSettings,
}

/// Knobs that come from the process rather than the app settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Bind listeners to and resolve `localhost` instead of the CNAME.
    pub debug_mode: bool,

    /// HTTPS call control port; plain HTTP uses the next port.
    pub call_control_port: u16,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            call_control_port: DEFAULT_CALL_CONTROL_PORT,
        }
    }
}

/// Builds a [`BotConfiguration`] from app settings.
#[derive(Debug)]
pub struct ConfigurationLoader<C, R> {
    settings: AppSettings,
    certificates: C,
    resolver: R,
    options: LoaderOptions,
}

impl<C, R> ConfigurationLoader<C, R>
where
    C: CertificateStore,
    R: HostResolver,
{
    pub fn new(settings: AppSettings, certificates: C, resolver: R, options: LoaderOptions) -> Self {
        Self {
            settings,
            certificates,
            resolver,
            options,
        }
    }

    /// Read, validate and assemble the configuration.
    ///
    /// Blocking: touches the filesystem and the system resolver.
    ///
    /// # Errors
    ///
    /// - `BotError::Config` for a missing, placeholder or malformed value
    /// - `BotError::Certificate` unless exactly one certificate matches
    /// - `BotError::CertificateStore` if the store cannot be read
    /// - `BotError::Dns` if the public hostname has no address
    pub fn initialize(&self) -> Result<BotConfiguration, BotError> {
        let service_dns_name =
            self.required(SERVICE_DNS_NAME_KEY, Some(DEFAULT_SERVICE_DNS_NAME_VALUE))?;
        // Key that supplied the CNAME, reported when a URL built from it is invalid
        let (service_cname, cname_key) =
            match self.optional(SERVICE_CNAME_KEY, Some(DEFAULT_SERVICE_CNAME_VALUE)) {
                Some(cname) => (cname, SERVICE_CNAME_KEY),
                None => (service_dns_name.clone(), SERVICE_DNS_NAME_KEY),
            };

        let place_call_endpoint_url = self
            .optional(PLACE_CALL_ENDPOINT_URL_KEY, None)
            .map(|raw| parse_url(PLACE_CALL_ENDPOINT_URL_KEY, &raw))
            .transpose()?;

        let certificate = self.certificate_from_store(CERTIFICATE_THUMBPRINT_KEY)?;

        let aad_app_id = self.required(AAD_APP_ID_KEY, Some(DEFAULT_AAD_APP_ID_VALUE))?;
        let aad_app_secret = SecretString::from(
            self.required(AAD_APP_SECRET_KEY, Some(DEFAULT_AAD_APP_SECRET_VALUE))?,
        );

        let base_domain = if self.options.debug_mode {
            DEBUG_BASE_DOMAIN
        } else {
            service_cname.as_str()
        };

        let call_control_base_url = parse_url(
            cname_key,
            &format!(
                "https://{service_cname}/{CALL_SIGNALING_ROUTE_PREFIX}/{ON_NOTIFICATION_REQUEST_ROUTE}"
            ),
        )?;
        trace_config_value("CallControlCallbackUri", &call_control_base_url);

        let call_control_listening_urls =
            listening_urls(cname_key, base_domain, self.options.call_control_port)?;
        for url in &call_control_listening_urls {
            trace_config_value("Call control listening Uri", url);
        }

        let instance_public_ip_address = self.resolve_public_address(base_domain)?;

        let instance_internal_port = self.port(INSTANCE_INTERNAL_PORT_KEY, None)?;
        let instance_public_port = self.port(
            INSTANCE_PUBLIC_PORT_KEY,
            Some(DEFAULT_INSTANCE_PUBLIC_PORT_VALUE),
        )?;

        self.trace_endpoint_info(
            &service_cname,
            SocketAddr::new(instance_public_ip_address, instance_public_port),
        );

        let media_platform_settings = MediaPlatformSettings {
            instance_settings: MediaPlatformInstanceSettings {
                certificate_thumbprint: certificate.thumbprint,
                instance_internal_port,
                instance_public_ip_address,
                instance_public_port,
                service_fqdn: service_cname.clone(),
            },
            application_id: aad_app_id.clone(),
        };

        Ok(BotConfiguration {
            service_dns_name,
            service_cname,
            call_control_listening_urls,
            call_control_base_url,
            place_call_endpoint_url,
            aad_app_id,
            aad_app_secret,
            media_platform_settings,
        })
    }

    /// Raw lookup; logs the value before any validation.
    fn read(&self, key: &str) -> Option<String> {
        let raw = self.settings.get(key);
        match raw {
            None => trace_config_value(key, &"<unset>"),
            Some(_) if key == AAD_APP_SECRET_KEY => trace_config_value(key, &"[REDACTED]"),
            Some(value) => trace_config_value(key, &value),
        }
        raw.map(str::to_string)
    }

    /// Set value with surrounding whitespace removed.
    fn required(&self, key: &str, placeholder: Option<&str>) -> Result<String, BotError> {
        self.optional(key, placeholder)
            .ok_or_else(|| BotError::config(key, VALUE_NOT_SET))
    }

    fn optional(&self, key: &str, placeholder: Option<&str>) -> Option<String> {
        self.read(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !is_unset(value, placeholder))
    }

    fn port(&self, key: &str, placeholder: Option<&str>) -> Result<u16, BotError> {
        let raw = self.required(key, placeholder)?;
        match raw.trim().parse::<u16>() {
            Ok(port) if port != 0 => Ok(port),
            _ => Err(BotError::config(
                key,
                format!("'{raw}' is not a port number between 1 and 65535"),
            )),
        }
    }

    fn certificate_from_store(&self, key: &str) -> Result<StoredCertificate, BotError> {
        let thumbprint = self.required(key, None)?;

        let mut matches = self.certificates.find_by_thumbprint(&thumbprint)?;
        let count = matches.len();

        match (count, matches.pop()) {
            (1, Some(certificate)) => {
                debug!(
                    thumbprint = %certificate.thumbprint,
                    source = %certificate.source.display(),
                    "Certificate found in machine store"
                );
                Ok(certificate)
            }
            _ => Err(BotError::Certificate {
                key: key.to_string(),
                thumbprint,
                matches: count,
            }),
        }
    }

    fn resolve_public_address(&self, host: &str) -> Result<IpAddr, BotError> {
        let addresses = self.resolver.resolve(host).map_err(|e| BotError::Dns {
            host: host.to_string(),
            reason: e.to_string(),
        })?;
        let addresses = dedup_preserving_order(addresses);

        debug!(host = %host, count = addresses.len(), "Public hostname resolved");

        addresses.first().copied().ok_or_else(|| BotError::Dns {
            host: host.to_string(),
            reason: "no addresses returned; make sure the public IP is properly configured for the service"
                .to_string(),
        })
    }

    /// One line per call control endpoint with its internal and public view.
    fn trace_endpoint_info(&self, service_cname: &str, public: SocketAddr) {
        let endpoints: &[&str] = if self.options.debug_mode {
            &[DEFAULT_ENDPOINT_KEY]
        } else {
            &[DEFAULT_ENDPOINT_KEY, INSTANCE_MEDIA_CONTROL_ENDPOINT_KEY]
        };

        for endpoint in endpoints {
            let configured = self.optional(endpoint, None);
            info!(
                endpoint = %endpoint,
                internal = %format!("https://{service_cname}"),
                configured = configured.as_deref().unwrap_or("<none>"),
                public = %public,
                "Endpoint info"
            );
        }
    }
}

fn is_unset(value: &str, placeholder: Option<&str>) -> bool {
    let value = value.trim();
    value.is_empty() || placeholder == Some(value)
}

fn trace_config_value(key: &str, value: &dyn fmt::Display) {
    info!(key = %key, value = %value, "Configuration value");
}

fn parse_url(key: &str, raw: &str) -> Result<Url, BotError> {
    Url::parse(raw).map_err(|e| BotError::config(key, format!("'{raw}' is not a valid URL: {e}")))
}

/// HTTPS listener on `port` and plain HTTP on `port + 1`. `key` names the
/// setting that supplied `base_domain`.
fn listening_urls(key: &str, base_domain: &str, port: u16) -> Result<Vec<Url>, BotError> {
    let http_port = port.checked_add(1).ok_or_else(|| {
        BotError::config(
            "call_control_port",
            format!("{port} leaves no room for the HTTP listener"),
        )
    })?;

    Ok(vec![
        parse_url(key, &format!("https://{base_domain}:{port}/"))?,
        parse_url(key, &format!("http://{base_domain}:{http_port}/"))?,
    ])
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;
    use std::io;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    const THUMBPRINT: &str = "0123456789ABCDEF0123456789ABCDEF01234567";

    struct FakeStore {
        certificates: Vec<StoredCertificate>,
    }

    impl FakeStore {
        fn with_thumbprints(thumbprints: &[&str]) -> Self {
            Self {
                certificates: thumbprints
                    .iter()
                    .map(|t| StoredCertificate {
                        thumbprint: (*t).to_string(),
                        der: Vec::new(),
                        source: PathBuf::from("/store/bot.pem"),
                    })
                    .collect(),
            }
        }
    }

    impl CertificateStore for FakeStore {
        fn find_by_thumbprint(
            &self,
            thumbprint: &str,
        ) -> Result<Vec<StoredCertificate>, BotError> {
            let wanted = crate::certificates::normalize_thumbprint(thumbprint);
            Ok(self
                .certificates
                .iter()
                .filter(|c| c.thumbprint == wanted)
                .cloned()
                .collect())
        }
    }

    struct FakeResolver {
        addresses: Vec<IpAddr>,
        fail: bool,
    }

    impl FakeResolver {
        fn returning(addresses: Vec<IpAddr>) -> Self {
            Self {
                addresses,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                addresses: Vec::new(),
                fail: true,
            }
        }
    }

    impl HostResolver for FakeResolver {
        fn resolve(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such host"));
            }
            Ok(self.addresses.clone())
        }
    }

    fn public_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(20, 30, 40, 50))
    }

    fn valid_settings() -> AppSettings {
        AppSettings::default()
            .with(SERVICE_DNS_NAME_KEY, "bot.example.com")
            .with(SERVICE_CNAME_KEY, "bot-cname.example.com")
            .with(CERTIFICATE_THUMBPRINT_KEY, THUMBPRINT)
            .with(AAD_APP_ID_KEY, "9ecd52e5-6592-42b7-b562-093f37f13bde")
            .with(AAD_APP_SECRET_KEY, "aad-secret-value")
            .with(INSTANCE_INTERNAL_PORT_KEY, "8445")
            .with(INSTANCE_PUBLIC_PORT_KEY, "14217")
    }

    fn loader(settings: AppSettings) -> ConfigurationLoader<FakeStore, FakeResolver> {
        ConfigurationLoader::new(
            settings,
            FakeStore::with_thumbprints(&[THUMBPRINT]),
            FakeResolver::returning(vec![public_ip()]),
            LoaderOptions::default(),
        )
    }

    fn expect_config_error(result: Result<BotConfiguration, BotError>, expected_key: &str) {
        match result {
            Err(BotError::Config { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected config error for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn test_initialize_success() {
        let config = loader(valid_settings())
            .initialize()
            .expect("configuration should load");

        assert_eq!(config.service_dns_name, "bot.example.com");
        assert_eq!(config.service_cname, "bot-cname.example.com");
        assert_eq!(
            config.call_control_base_url.as_str(),
            "https://bot-cname.example.com/api/calling/notification"
        );
        assert_eq!(
            config
                .call_control_listening_urls
                .iter()
                .map(Url::as_str)
                .collect::<Vec<_>>(),
            vec![
                "https://bot-cname.example.com:9441/",
                "http://bot-cname.example.com:9442/"
            ]
        );
        assert!(config.place_call_endpoint_url.is_none());
        assert_eq!(config.aad_app_id, "9ecd52e5-6592-42b7-b562-093f37f13bde");
        assert_eq!(config.aad_app_secret.expose_secret(), "aad-secret-value");

        let media = &config.media_platform_settings;
        assert_eq!(media.application_id, config.aad_app_id);
        assert_eq!(media.instance_settings.certificate_thumbprint, THUMBPRINT);
        assert_eq!(media.instance_settings.instance_internal_port, 8445);
        assert_eq!(media.instance_settings.instance_public_port, 14217);
        assert_eq!(media.instance_settings.instance_public_ip_address, public_ip());
        assert_eq!(media.instance_settings.service_fqdn, "bot-cname.example.com");
    }

    #[test]
    fn test_required_keys_missing_fail_naming_key() {
        for key in [
            SERVICE_DNS_NAME_KEY,
            CERTIFICATE_THUMBPRINT_KEY,
            AAD_APP_ID_KEY,
            AAD_APP_SECRET_KEY,
            INSTANCE_INTERNAL_PORT_KEY,
            INSTANCE_PUBLIC_PORT_KEY,
        ] {
            let result = loader(valid_settings().without(key)).initialize();
            expect_config_error(result, key);
        }
    }

    #[test]
    fn test_required_keys_blank_fail_naming_key() {
        for key in [SERVICE_DNS_NAME_KEY, AAD_APP_ID_KEY, INSTANCE_INTERNAL_PORT_KEY] {
            let result = loader(valid_settings().with(key, "   ")).initialize();
            expect_config_error(result, key);
        }
    }

    #[test]
    fn test_required_keys_placeholder_fail_naming_key() {
        for (key, placeholder) in [
            (SERVICE_DNS_NAME_KEY, DEFAULT_SERVICE_DNS_NAME_VALUE),
            (AAD_APP_ID_KEY, DEFAULT_AAD_APP_ID_VALUE),
            (AAD_APP_SECRET_KEY, DEFAULT_AAD_APP_SECRET_VALUE),
            (INSTANCE_PUBLIC_PORT_KEY, DEFAULT_INSTANCE_PUBLIC_PORT_VALUE),
        ] {
            let result = loader(valid_settings().with(key, placeholder)).initialize();
            expect_config_error(result, key);
        }
    }

    #[test]
    fn test_cname_placeholder_falls_back_to_dns_name() {
        let settings = valid_settings().with(SERVICE_CNAME_KEY, DEFAULT_SERVICE_CNAME_VALUE);
        let config = loader(settings).initialize().expect("configuration should load");

        assert_eq!(config.service_cname, "bot.example.com");
        assert_eq!(
            config.call_control_base_url.as_str(),
            "https://bot.example.com/api/calling/notification"
        );
        assert_eq!(
            config.media_platform_settings.instance_settings.service_fqdn,
            "bot.example.com"
        );
    }

    #[test]
    fn test_cname_missing_falls_back_to_dns_name() {
        let settings = valid_settings().without(SERVICE_CNAME_KEY);
        let config = loader(settings).initialize().expect("configuration should load");
        assert_eq!(config.service_cname, "bot.example.com");
    }

    #[test]
    fn test_place_call_endpoint_url_optional() {
        let settings = valid_settings().with(PLACE_CALL_ENDPOINT_URL_KEY, "");
        let config = loader(settings).initialize().expect("configuration should load");
        assert!(config.place_call_endpoint_url.is_none());

        let settings =
            valid_settings().with(PLACE_CALL_ENDPOINT_URL_KEY, "https://graph.example.com/v1.0");
        let config = loader(settings).initialize().expect("configuration should load");
        assert_eq!(
            config.place_call_endpoint_url.map(|u| u.to_string()),
            Some("https://graph.example.com/v1.0".to_string())
        );
    }

    #[test]
    fn test_place_call_endpoint_url_invalid() {
        let settings = valid_settings().with(PLACE_CALL_ENDPOINT_URL_KEY, "not a url");
        expect_config_error(loader(settings).initialize(), PLACE_CALL_ENDPOINT_URL_KEY);
    }

    #[test]
    fn test_invalid_ports_fail_naming_key() {
        for (key, value) in [
            (INSTANCE_INTERNAL_PORT_KEY, "abc"),
            (INSTANCE_INTERNAL_PORT_KEY, "0"),
            (INSTANCE_PUBLIC_PORT_KEY, "70000"),
            (INSTANCE_PUBLIC_PORT_KEY, "-1"),
        ] {
            let result = loader(valid_settings().with(key, value)).initialize();
            expect_config_error(result, key);
        }
    }

    #[test]
    fn test_certificate_zero_matches() {
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[]),
            FakeResolver::returning(vec![public_ip()]),
            LoaderOptions::default(),
        );

        let result = loader.initialize();
        assert!(matches!(
            result,
            Err(BotError::Certificate { ref key, ref thumbprint, matches: 0 })
                if key == CERTIFICATE_THUMBPRINT_KEY && thumbprint == THUMBPRINT
        ));
    }

    #[test]
    fn test_certificate_multiple_matches() {
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[THUMBPRINT, THUMBPRINT]),
            FakeResolver::returning(vec![public_ip()]),
            LoaderOptions::default(),
        );

        let result = loader.initialize();
        assert!(matches!(result, Err(BotError::Certificate { matches: 2, .. })));
    }

    #[test]
    fn test_certificate_thumbprint_matched_case_insensitively() {
        let settings =
            valid_settings().with(CERTIFICATE_THUMBPRINT_KEY, THUMBPRINT.to_lowercase());
        let config = loader(settings).initialize().expect("configuration should load");

        // The store's canonical thumbprint is reported, not the configured spelling
        assert_eq!(
            config
                .media_platform_settings
                .instance_settings
                .certificate_thumbprint,
            THUMBPRINT
        );
    }

    #[test]
    fn test_public_ip_is_first_resolved_address() {
        let first = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[THUMBPRINT]),
            FakeResolver::returning(vec![first, public_ip(), first]),
            LoaderOptions::default(),
        );

        let config = loader.initialize().expect("configuration should load");
        assert_eq!(
            config
                .media_platform_settings
                .instance_settings
                .instance_public_ip_address,
            first
        );
    }

    #[test]
    fn test_resolution_with_no_addresses_fails() {
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[THUMBPRINT]),
            FakeResolver::returning(Vec::new()),
            LoaderOptions::default(),
        );

        let result = loader.initialize();
        assert!(
            matches!(result, Err(BotError::Dns { ref host, .. }) if host == "bot-cname.example.com")
        );
    }

    #[test]
    fn test_resolver_error_fails() {
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[THUMBPRINT]),
            FakeResolver::failing(),
            LoaderOptions::default(),
        );

        let result = loader.initialize();
        assert!(matches!(result, Err(BotError::Dns { reason, .. }) if reason.contains("no such host")));
    }

    #[test]
    fn test_debug_mode_uses_localhost_for_listeners() {
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[THUMBPRINT]),
            FakeResolver::returning(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]),
            LoaderOptions {
                debug_mode: true,
                call_control_port: 9441,
            },
        );

        let config = loader.initialize().expect("configuration should load");

        assert_eq!(
            config.call_control_listening_urls[0].as_str(),
            "https://localhost:9441/"
        );
        assert_eq!(
            config.call_control_listening_urls[1].as_str(),
            "http://localhost:9442/"
        );
        // Callback URL always uses the CNAME
        assert_eq!(
            config.call_control_base_url.as_str(),
            "https://bot-cname.example.com/api/calling/notification"
        );
    }

    #[test]
    fn test_custom_call_control_port() {
        let loader = ConfigurationLoader::new(
            valid_settings(),
            FakeStore::with_thumbprints(&[THUMBPRINT]),
            FakeResolver::returning(vec![public_ip()]),
            LoaderOptions {
                debug_mode: false,
                call_control_port: 10443,
            },
        );

        let config = loader.initialize().expect("configuration should load");
        assert_eq!(
            config.call_control_listening_urls[0].port(),
            Some(10443)
        );
        assert_eq!(
            config.call_control_listening_urls[1].port(),
            Some(10444)
        );
    }

    #[test]
    fn test_listening_urls_reject_last_port() {
        let result = listening_urls(SERVICE_CNAME_KEY, "bot.example.com", u16::MAX);
        assert!(matches!(result, Err(BotError::Config { .. })));
    }

    #[test]
    fn test_is_unset() {
        assert!(is_unset("", None));
        assert!(is_unset("  ", Some("%CName%")));
        assert!(is_unset("%CName%", Some("%CName%")));
        assert!(is_unset(" %CName% ", Some("%CName%")));
        assert!(!is_unset("%CName%", None));
        assert!(!is_unset("bot.example.com", Some("%CName%")));
    }

    #[test]
    fn test_values_are_trimmed() {
        let settings = valid_settings()
            .without(SERVICE_CNAME_KEY)
            .with(SERVICE_DNS_NAME_KEY, " bot.example.com\t")
            .with(AAD_APP_ID_KEY, "app-id ");
        let config = loader(settings).initialize().expect("configuration should load");

        assert_eq!(config.service_dns_name, "bot.example.com");
        assert_eq!(config.service_cname, "bot.example.com");
        assert_eq!(config.aad_app_id, "app-id");
        assert_eq!(
            config.call_control_base_url.as_str(),
            "https://bot.example.com/api/calling/notification"
        );
    }

    #[test]
    fn test_invalid_host_names_the_key_that_supplied_it() {
        // No CNAME: the DNS name is used and is the one to blame
        let settings = valid_settings()
            .without(SERVICE_CNAME_KEY)
            .with(SERVICE_DNS_NAME_KEY, "bot example.com");
        expect_config_error(loader(settings).initialize(), SERVICE_DNS_NAME_KEY);

        let settings = valid_settings().with(SERVICE_CNAME_KEY, "bot cname.example.com");
        expect_config_error(loader(settings).initialize(), SERVICE_CNAME_KEY);
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs.contents())
    }

    #[test]
    fn test_values_are_logged_before_validation() {
        let settings = valid_settings().with(AAD_APP_ID_KEY, DEFAULT_AAD_APP_ID_VALUE);

        let (result, logs) = with_captured_logs(|| loader(settings).initialize());

        expect_config_error(result, AAD_APP_ID_KEY);
        assert!(
            logs.contains("key=AadAppId value=%AadAppId%"),
            "placeholder value should be logged: {logs}"
        );
        // Keys read before the failure are logged too, later ones are not
        assert!(logs.contains("key=ServiceDNSName value=bot.example.com"));
        assert!(!logs.contains("key=AadAppSecret"));
    }

    #[test]
    fn test_secret_is_never_logged() {
        let (result, logs) = with_captured_logs(|| loader(valid_settings()).initialize());

        result.expect("configuration should load");
        assert!(!logs.contains("aad-secret-value"), "secret leaked: {logs}");
        assert!(logs.contains("key=AadAppSecret value=[REDACTED]"));
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let config = loader(valid_settings())
            .initialize()
            .expect("configuration should load");

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("aad-secret-value"));
        assert!(debug_output.contains("REDACTED"));
    }
}
