//! Machine certificate store lookup.
//!
//! The personal store of the local machine is a directory of certificate
//! files. A certificate is identified by its thumbprint: the upper-case
//! hex SHA-1 digest of its DER encoding. Lookups include expired
//! certificates; validity is the platform's concern once the thumbprint is
//! handed over.

use crate::errors::BotError;
use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions read from the store directory.
const CERTIFICATE_EXTENSIONS: [&str; 4] = ["pem", "crt", "cer", "der"];

/// Extensions that may hold a bare DER certificate.
const DER_EXTENSIONS: [&str; 2] = ["cer", "der"];

/// A certificate found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCertificate {
    /// Upper-case hex SHA-1 of the DER encoding.
    pub thumbprint: String,
    /// DER-encoded certificate.
    pub der: Vec<u8>,
    /// File the certificate was read from.
    pub source: PathBuf,
}

impl StoredCertificate {
    /// Wrap DER bytes, computing the thumbprint.
    #[must_use]
    pub fn from_der(der: Vec<u8>, source: impl Into<PathBuf>) -> Self {
        Self {
            thumbprint: compute_thumbprint(&der),
            der,
            source: source.into(),
        }
    }
}

/// Certificate lookup by thumbprint.
pub trait CertificateStore {
    /// Return every certificate whose thumbprint matches, expired ones
    /// included.
    fn find_by_thumbprint(&self, thumbprint: &str) -> Result<Vec<StoredCertificate>, BotError>;
}

/// Upper-case hex SHA-1 digest of a DER-encoded certificate.
#[must_use]
pub fn compute_thumbprint(der: &[u8]) -> String {
    hex::encode_upper(digest(&SHA1_FOR_LEGACY_USE_ONLY, der))
}

/// Canonical form of a configured thumbprint.
///
/// Drops whitespace, `:` separators and the invisible direction marks that
/// certificate management UIs prepend on copy, then upper-cases.
#[must_use]
pub fn normalize_thumbprint(thumbprint: &str) -> String {
    thumbprint
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(*c, ':' | '\u{200e}' | '\u{200f}' | '\u{feff}'))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Certificate store backed by a directory of PEM or DER files.
#[derive(Debug, Clone)]
pub struct PemDirectoryStore {
    root: PathBuf,
}

impl PemDirectoryStore {
    /// Create a store rooted at `root`. Nothing is read until a lookup.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read every certificate currently in the store.
    pub fn load_all(&self) -> Result<Vec<StoredCertificate>, BotError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            BotError::CertificateStore(format!(
                "Failed to open certificate store {}: {e}",
                self.root.display()
            ))
        })?;

        let mut certificates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                BotError::CertificateStore(format!(
                    "Failed to list certificate store {}: {e}",
                    self.root.display()
                ))
            })?;
            let path = entry.path();

            if !path.is_file() || !has_extension(&path, &CERTIFICATE_EXTENSIONS) {
                continue;
            }

            match read_certificate_file(&path) {
                Ok(mut found) => certificates.append(&mut found),
                Err(e) => {
                    // One unreadable file does not hide the rest of the store
                    warn!(path = %path.display(), error = %e, "Skipping unreadable certificate file");
                }
            }
        }

        debug!(
            store = %self.root.display(),
            count = certificates.len(),
            "Certificate store loaded"
        );

        Ok(certificates)
    }
}

impl CertificateStore for PemDirectoryStore {
    fn find_by_thumbprint(&self, thumbprint: &str) -> Result<Vec<StoredCertificate>, BotError> {
        let wanted = normalize_thumbprint(thumbprint);
        let matches = self
            .load_all()?
            .into_iter()
            .filter(|cert| cert.thumbprint == wanted)
            .collect();
        Ok(matches)
    }
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

fn read_certificate_file(path: &Path) -> std::io::Result<Vec<StoredCertificate>> {
    let bytes = fs::read(path)?;

    let mut reader = BufReader::new(bytes.as_slice());
    let certificates = rustls_pemfile::certs(&mut reader)
        .map(|der| der.map(|der| StoredCertificate::from_der(der.as_ref().to_vec(), path)))
        .collect::<Result<Vec<_>, _>>()?;

    if certificates.is_empty() && has_extension(path, &DER_EXTENSIONS) && !bytes.is_empty() {
        return Ok(vec![StoredCertificate::from_der(bytes, path)]);
    }

    Ok(certificates)
}
