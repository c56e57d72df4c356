//! Secret types for protecting credentials from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the AAD application secret and
//! any other credential that flows through configuration. `SecretString`
//! implements `Debug` with redaction, so a configuration struct that derives
//! `Debug` never prints the credential, whether through `{:?}` or a
//! `tracing` field.
//!
//! Secrets are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct AppCredentials {
//!     app_id: String,
//!     app_secret: SecretString,
//! }
//!
//! let creds = AppCredentials {
//!     app_id: "9ecd52e5-6592-42b7-b562-093f37f13bde".to_string(),
//!     app_secret: SecretString::from("s3cr3t"),
//! };
//!
//! // Debug output hides the secret
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//!
//! // Reading the value is an explicit, greppable operation
//! let secret: &str = creds.app_secret.expose_secret();
//! assert_eq!(secret, "s3cr3t");
//! ```
//!
//! With the `serde` feature (enabled in the workspace), secrets deserialize
//! directly from settings files.

pub use secrecy::{ExposeSecret, SecretString};
