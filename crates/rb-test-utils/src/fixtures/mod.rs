//! Pre-configured test data fixtures for recording bot testing.
//!
//! Provides:
//! - A temporary certificate store populated with self-signed certificates
//! - App settings with every required key set to a valid value

use std::fs;
use std::path::{Path, PathBuf};

use rcgen::CertifiedKey;
use recording_bot::certificates::{compute_thumbprint, PemDirectoryStore};
use recording_bot::settings::{
    AppSettings, AAD_APP_ID_KEY, AAD_APP_SECRET_KEY, CERTIFICATE_THUMBPRINT_KEY,
    INSTANCE_INTERNAL_PORT_KEY, INSTANCE_PUBLIC_PORT_KEY, SERVICE_CNAME_KEY,
    SERVICE_DNS_NAME_KEY,
};
use tempfile::TempDir;

/// Default service DNS name used by fixtures.
pub const TEST_SERVICE_DNS_NAME: &str = "bot.example.com";

/// Default AAD application id used by fixtures.
pub const TEST_AAD_APP_ID: &str = "9ecd52e5-6592-42b7-b562-093f37f13bde";

/// Default AAD application secret used by fixtures.
pub const TEST_AAD_APP_SECRET: &str = "test-app-secret";

/// Default internal media port used by fixtures.
pub const TEST_INTERNAL_PORT: u16 = 8445;

/// Default public media port used by fixtures.
pub const TEST_PUBLIC_PORT: u16 = 14217;

/// A certificate written into a [`TestCertificateStore`].
#[derive(Debug, Clone)]
pub struct TestCertificate {
    /// Upper-case hex SHA-1 of the DER encoding.
    pub thumbprint: String,
    /// DER encoding.
    pub der: Vec<u8>,
    /// File the certificate was written to.
    pub path: PathBuf,
}

/// Certificate store directory that is removed on drop.
#[derive(Debug)]
pub struct TestCertificateStore {
    dir: TempDir,
    next_file: usize,
}

impl Default for TestCertificateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCertificateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create certificate store directory"),
            next_file: 0,
        }
    }

    /// Store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A [`PemDirectoryStore`] reading this directory.
    #[must_use]
    pub fn store(&self) -> PemDirectoryStore {
        PemDirectoryStore::new(self.dir.path())
    }

    /// Generate a self-signed certificate for `subject` and write it as PEM.
    pub fn add_pem(&mut self, subject: &str) -> TestCertificate {
        let cert = generate(subject);
        let path = self.next_path("pem");
        fs::write(&path, cert.cert.pem()).expect("Failed to write PEM certificate");
        Self::describe(&cert, path)
    }

    /// Generate a self-signed certificate for `subject` and write it as raw DER.
    pub fn add_der(&mut self, subject: &str) -> TestCertificate {
        let cert = generate(subject);
        let path = self.next_path("cer");
        fs::write(&path, cert.cert.der().to_vec()).expect("Failed to write DER certificate");
        Self::describe(&cert, path)
    }

    /// Write an existing certificate again under a new file name.
    pub fn add_copy(&mut self, certificate: &TestCertificate) -> TestCertificate {
        let path = self.next_path("der");
        fs::write(&path, &certificate.der).expect("Failed to write certificate copy");
        TestCertificate {
            path,
            ..certificate.clone()
        }
    }

    /// Write arbitrary content into the store.
    pub fn add_raw(&mut self, file_name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, content).expect("Failed to write store file");
        path
    }

    fn next_path(&mut self, extension: &str) -> PathBuf {
        self.next_file += 1;
        self.dir
            .path()
            .join(format!("cert-{}.{extension}", self.next_file))
    }

    fn describe(cert: &CertifiedKey, path: PathBuf) -> TestCertificate {
        let der = cert.cert.der().to_vec();
        TestCertificate {
            thumbprint: compute_thumbprint(&der),
            der,
            path,
        }
    }
}

fn generate(subject: &str) -> CertifiedKey {
    rcgen::generate_simple_self_signed(vec![subject.to_string()])
        .expect("Failed to generate self-signed certificate")
}

/// Builder for [`AppSettings`] with every required key set.
#[derive(Debug, Clone)]
pub struct TestSettings {
    settings: AppSettings,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSettings {
    /// Valid settings, except for a thumbprint that matches nothing.
    #[must_use]
    pub fn new() -> Self {
        let settings = AppSettings::default()
            .with(SERVICE_DNS_NAME_KEY, TEST_SERVICE_DNS_NAME)
            .with(CERTIFICATE_THUMBPRINT_KEY, "0000000000000000000000000000000000000000")
            .with(AAD_APP_ID_KEY, TEST_AAD_APP_ID)
            .with(AAD_APP_SECRET_KEY, TEST_AAD_APP_SECRET)
            .with(INSTANCE_INTERNAL_PORT_KEY, TEST_INTERNAL_PORT.to_string())
            .with(INSTANCE_PUBLIC_PORT_KEY, TEST_PUBLIC_PORT.to_string());
        Self { settings }
    }

    /// Set the certificate thumbprint.
    #[must_use]
    pub fn with_thumbprint(self, thumbprint: &str) -> Self {
        self.with(CERTIFICATE_THUMBPRINT_KEY, thumbprint)
    }

    /// Set the service CNAME.
    #[must_use]
    pub fn with_cname(self, cname: &str) -> Self {
        self.with(SERVICE_CNAME_KEY, cname)
    }

    /// Set any key.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.settings = self.settings.with(key, value);
        self
    }

    /// Remove a key.
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.settings = self.settings.without(key);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> AppSettings {
        self.settings
    }
}
