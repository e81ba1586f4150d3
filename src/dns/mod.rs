//! Host resolution: DNS-over-HTTPS with a system resolver fallback

use crate::error::{AppError, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;
use std::time::Duration;
use trust_dns_resolver::{system_conf, TokioAsyncResolver};

/// Dotted-quad matcher used when the DoH body is not structured JSON
fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("valid IPv4 pattern"))
}

/// Keep the first occurrence of each item
pub fn dedup_preserving_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

/// All distinct IPv4 addresses appearing anywhere in `text`, in first-seen order
pub fn extract_ipv4(text: &str) -> Vec<Ipv4Addr> {
    dedup_preserving_order(
        ipv4_pattern()
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<Ipv4Addr>().ok()),
    )
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

/// Parse a DoH body.
///
/// The structured `{"Answer":[{"data":..}]}` form wins when it yields at
/// least one IPv4 address; otherwise the raw body is scanned.
pub fn parse_doh_body(body: &str) -> Vec<Ipv4Addr> {
    if let Ok(response) = serde_json::from_str::<DohResponse>(body) {
        let structured = dedup_preserving_order(
            response
                .answer
                .iter()
                .filter_map(|a| a.data.trim().parse::<Ipv4Addr>().ok()),
        );
        if !structured.is_empty() {
            return structured;
        }
    }
    extract_ipv4(body)
}

/// DNS-over-HTTPS client for JSON resolvers such as AliDNS
#[derive(Clone)]
pub struct DoHClient {
    url: String,
    client: Client,
    timeout: Duration,
}

impl DoHClient {
    /// Create a new DoH client
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
            timeout: crate::defaults::DOH_TIMEOUT,
        }
    }

    /// Override the request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query A records for `host`.
    ///
    /// Transport errors and timeouts are errors. Any body that arrives is
    /// parsed whatever the status, so an error page yields an empty list.
    pub async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        let request = async {
            let response = self
                .client
                .get(&self.url)
                .query(&[("name", host), ("type", "A"), ("short", "1")])
                .header("Accept", "application/dns-json")
                .send()
                .await
                .map_err(|e| AppError::network(format!("DoH request failed: {}", e)))?;

            response
                .text()
                .await
                .map_err(|e| AppError::network(format!("Failed to read DoH response: {}", e)))
        };

        let body = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| AppError::timeout(format!("DoH query for {} timed out", host)))??;

        Ok(parse_doh_body(&body))
    }
}

/// The host's own resolver
pub struct SystemResolver {
    resolver: Option<TokioAsyncResolver>,
}

impl SystemResolver {
    /// Build from the system configuration, falling back to the libc
    /// resolver when it cannot be read
    pub fn new() -> Self {
        let resolver = system_conf::read_system_conf()
            .ok()
            .map(|(config, opts)| TokioAsyncResolver::tokio(config, opts));
        Self { resolver }
    }

    /// First IPv4 address for `host`
    pub async fn first_ipv4(&self, host: &str) -> Result<Ipv4Addr> {
        let addresses: Vec<IpAddr> = match &self.resolver {
            Some(resolver) => match resolver.lookup_ip(host).await {
                Ok(lookup) => lookup.iter().collect(),
                Err(_) => Self::lookup_with_libc(host).await?,
            },
            None => Self::lookup_with_libc(host).await?,
        };

        addresses
            .into_iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| AppError::dns_resolution(format!("No IPv4 address found for {}", host)))
    }

    async fn lookup_with_libc(host: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| AppError::dns_resolution(format!("DNS lookup failed for {}: {}", host, e)))?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}
