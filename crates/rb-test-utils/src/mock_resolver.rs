//! Resolver with canned answers.

use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use recording_bot::dns::HostResolver;

/// Resolver that returns fixed addresses and records every lookup.
#[derive(Debug, Clone)]
pub struct MockResolver {
    answer: Result<Vec<IpAddr>, String>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    /// Answer every lookup with `addresses`.
    pub fn returning(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            answer: Ok(addresses.into_iter().collect()),
            lookups: Arc::default(),
        }
    }

    /// Fail every lookup with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Err(reason.to_string()),
            lookups: Arc::default(),
        }
    }

    /// Hostnames looked up so far, in order.
    ///
    /// Clones share the record, so keep a clone before handing the
    /// resolver to a loader.
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl HostResolver for MockResolver {
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self.lookups.lock().unwrap().push(host.to_string());
        match &self.answer {
            Ok(addresses) => Ok(addresses.clone()),
            Err(reason) => Err(io::Error::new(io::ErrorKind::NotFound, reason.clone())),
        }
    }
}
