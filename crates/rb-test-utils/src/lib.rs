//! # Recording Bot Test Utilities
//!
//! Fixtures and mocks for exercising the recording bot bootstrap without a
//! real machine certificate store, DNS or hosted service.
//!
//! ## Modules
//!
//! - `fixtures` - Certificate stores on disk and valid app settings
//! - `mock_resolver` - Resolver returning fixed addresses
//! - `mock_service` - `BotService` that records calls
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rb_test_utils::*;
//!
//! let store = TestCertificateStore::new();
//! let cert = store.add_pem("bot.example.com");
//!
//! let settings = TestSettings::new()
//!     .with_thumbprint(&cert.thumbprint)
//!     .build();
//!
//! let loader = ConfigurationLoader::new(
//!     settings,
//!     store.store(),
//!     MockResolver::returning(["203.0.113.10".parse().unwrap()]),
//!     LoaderOptions::default(),
//! );
//! ```

pub mod fixtures;
pub mod mock_resolver;
pub mod mock_service;

pub use fixtures::*;
pub use mock_resolver::*;
pub use mock_service::*;
