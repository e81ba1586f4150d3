//! HTTP client construction for probes and lookups

use crate::{
    error::{AppError, Result},
    models::Endpoint,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Headers sent with every transfer and latency request.
///
/// `Accept-Encoding: identity` keeps byte counts equal to wire bytes.
pub fn probe_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(crate::defaults::USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh-Hans;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers
}

/// Headers of the resumable-upload draft sent with upload probes
pub fn upload_draft_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Upload-Draft-Interop-Version", HeaderValue::from_static("6"));
    headers.insert("Upload-Complete", HeaderValue::from_static("?1"));
    headers
}

/// HTTP client factory for the different request kinds of a session
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    pin: Option<(String, IpAddr)>,
    connect_timeout: Option<Duration>,
}

impl ClientFactory {
    /// Factory using default DNS for every host
    pub fn new() -> Self {
        Self::default()
    }

    /// Route connections for `host` to the selected endpoint.
    ///
    /// An unset endpoint or an address that does not parse leaves DNS alone.
    pub fn with_endpoint(mut self, host: &str, endpoint: &Endpoint) -> Self {
        self.pin = match endpoint.ip.parse::<IpAddr>() {
            Ok(ip) if endpoint.is_set() && !host.is_empty() => Some((host.to_string(), ip)),
            _ => None,
        };
        self
    }

    /// Bound connection establishment
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Pinned address, if any
    pub fn pinned(&self) -> Option<(&str, IpAddr)> {
        self.pin.as_ref().map(|(host, ip)| (host.as_str(), *ip))
    }

    /// Client for download, upload and latency probes.
    ///
    /// HTTP/1.1 only so that every worker owns its own connection.
    /// No overall timeout; workers enforce their own deadlines.
    pub fn create_probe_client(&self) -> Result<Client> {
        let mut builder = Client::builder().http1_only();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some((host, ip)) = &self.pin {
            // Port is taken from the URL; only the address matters here
            builder = builder.resolve(host, SocketAddr::new(*ip, 0));
        }

        builder
            .build()
            .map_err(|e| AppError::network(format!("Failed to create probe client: {}", e)))
    }

    /// Client for DoH and geolocation lookups, never pinned
    pub fn create_lookup_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
    }
}
