//! Hostname resolution for the media platform's public address.

use std::io;
use std::net::{IpAddr, ToSocketAddrs};

/// Resolves a hostname to its addresses, in resolver order.
pub trait HostResolver {
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addresses = (host, 0).to_socket_addrs()?.map(|addr| addr.ip());
        Ok(dedup_preserving_order(addresses))
    }
}

/// `getaddrinfo` repeats an address once per socket type; keep the first.
pub(crate) fn dedup_preserving_order(addresses: impl IntoIterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut unique: Vec<IpAddr> = Vec::new();
    for addr in addresses {
        if !unique.contains(&addr) {
            unique.push(addr);
        }
    }
    unique
}
