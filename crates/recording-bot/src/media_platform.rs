//! Settings handed to the media platform.

use std::net::IpAddr;

/// Per-instance media platform settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlatformInstanceSettings {
    /// Thumbprint of the certificate the media platform serves.
    pub certificate_thumbprint: String,

    /// Port the media platform listens on inside the instance.
    pub instance_internal_port: u16,

    /// Public address the instance is reachable on.
    pub instance_public_ip_address: IpAddr,

    /// Public port mapped to `instance_internal_port`.
    pub instance_public_port: u16,

    /// Fully qualified domain name of the service.
    pub service_fqdn: String,
}

/// Media platform settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlatformSettings {
    pub instance_settings: MediaPlatformInstanceSettings,

    /// AAD application id the platform authenticates as.
    pub application_id: String,
}
