//! Endpoint selection
//!
//! Resolves the probe host to candidate addresses, annotates them with
//! their location and picks one for the session. Resolution order:
//!
//! 1. DNS-over-HTTPS (structured answer, then a raw scan of the body)
//! 2. the system resolver, which yields a single unannotated address
//! 3. no override at all
//!
//! Nothing here is fatal; the worst outcome is an unset [`Endpoint`].

pub mod geo;
pub mod prompt;

pub use geo::{describe_info, GeoLocator};
pub use prompt::{default_input, parse_selection, FixedSelection, SelectionInput, StdinSelection};

use crate::dns::{DoHClient, SystemResolver};
use crate::logging::NetworkLogger;
use crate::models::Endpoint;
use crate::output::OutputSink;
use crate::transfer::CancelScope;
use std::sync::Arc;
use std::time::Instant;

pub const SYSTEM_DNS_DESC: &str = "system DNS fallback";

/// Hostname of `raw`, or an empty string when it has none
pub fn host_from_url(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string()))
        .unwrap_or_default()
}

/// Picks the address used for the measurement passes
pub struct EndpointResolver {
    doh: DoHClient,
    system: SystemResolver,
    geo: GeoLocator,
    sink: Arc<dyn OutputSink>,
    input: Arc<dyn SelectionInput>,
    logger: Option<NetworkLogger>,
}

impl EndpointResolver {
    pub fn new(doh: DoHClient, geo: GeoLocator, sink: Arc<dyn OutputSink>, input: Arc<dyn SelectionInput>) -> Self {
        Self {
            doh,
            system: SystemResolver::new(),
            geo,
            sink,
            input,
            logger: None,
        }
    }

    pub fn with_system_resolver(mut self, system: SystemResolver) -> Self {
        self.system = system;
        self
    }

    pub fn with_logger(mut self, logger: NetworkLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Resolve `host` and select one endpoint.
    ///
    /// The user is only asked when `interactive` is set and more than one
    /// candidate exists; otherwise the first candidate wins.
    pub async fn choose(&self, scope: &CancelScope, host: &str, interactive: bool) -> Endpoint {
        self.sink.header("Endpoint Selection");
        if host.is_empty() {
            self.sink.warn("Could not parse host from DL_URL. Skip endpoint selection.");
            return Endpoint::default();
        }
        self.sink.info(&format!("Host: {}", host));

        let ips = self.resolve_doh(scope, host).await;
        if ips.is_empty() {
            self.sink.warn("AliDNS DoH returned no IPv4 endpoint. Fallback to system DNS.");
            return match self.resolve_system(scope, host).await {
                Some(ip) => {
                    let endpoint = Endpoint::new(ip, SYSTEM_DNS_DESC);
                    self.announce(&endpoint);
                    endpoint
                }
                None => {
                    self.sink.warn("Could not resolve endpoint IP, continue with default DNS.");
                    Endpoint::default()
                }
            };
        }

        let endpoints = match scope.run(self.geo.describe_all(&ips)).await {
            Some(endpoints) => endpoints,
            None => ips
                .iter()
                .map(|ip| Endpoint::new(ip.clone(), geo::LOOKUP_FAILED))
                .collect(),
        };

        if let Some(logger) = &self.logger {
            for endpoint in &endpoints {
                let ok = endpoint.desc != geo::LOOKUP_FAILED;
                logger.log_geo_lookup(&endpoint.ip, ok, &endpoint.desc).await;
            }
        }

        self.sink.info("Available endpoints:");
        for (i, endpoint) in endpoints.iter().enumerate() {
            self.sink.info(&format!("  {}) {}  {}", i + 1, endpoint.ip, endpoint.desc));
        }

        let choice = if endpoints.len() > 1 && interactive && !scope.is_cancelled() {
            self.prompt(endpoints.len()).await
        } else {
            0
        };

        let selected = endpoints.into_iter().nth(choice).unwrap_or_default();
        self.announce(&selected);
        selected
    }

    fn announce(&self, endpoint: &Endpoint) {
        self.sink
            .info(&format!("Selected endpoint: {} ({})", endpoint.ip, endpoint.desc));
    }

    async fn resolve_doh(&self, scope: &CancelScope, host: &str) -> Vec<String> {
        let started = Instant::now();
        let result = scope.run(self.doh.resolve_ipv4(host)).await;
        let ips: Vec<String> = match result {
            Some(Ok(ips)) => ips.iter().map(|ip| ip.to_string()).collect(),
            Some(Err(_)) | None => Vec::new(),
        };

        if let Some(logger) = &self.logger {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            logger.log_doh_query(host, self.doh.url(), ips.len(), elapsed_ms).await;
        }
        ips
    }

    async fn resolve_system(&self, scope: &CancelScope, host: &str) -> Option<String> {
        let result = scope.run(self.system.first_ipv4(host)).await?;
        let address = result.as_ref().ok().map(|ip| ip.to_string());

        if let Some(logger) = &self.logger {
            let error = result.as_ref().err().map(|e| e.to_string());
            logger
                .log_system_lookup(host, address.as_deref(), error.as_deref())
                .await;
        }
        address
    }

    async fn prompt(&self, count: usize) -> usize {
        let input = Arc::clone(&self.input);
        let answer = tokio::task::spawn_blocking(move || input.read_selection(count)).await;

        let raw = match answer {
            Ok(Ok(line)) => line,
            _ => String::new(),
        };

        let (index, warning) = parse_selection(&raw, count);
        if let Some(warning) = warning {
            self.sink.warn(&warning);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MemorySink, OutputEvent};
    use reqwest::Client;

    #[test]
    fn test_host_from_url() {
        assert_eq!(
            host_from_url("https://mensura.cdn-apple.com/api/v1/gm/large"),
            "mensura.cdn-apple.com"
        );
        assert_eq!(host_from_url("http://example.com:8080/path"), "example.com");
        assert_eq!(host_from_url("http://[::1]:8080/"), "::1");
        assert_eq!(host_from_url("not-a-url"), "");
    }

    fn resolver(sink: Arc<MemorySink>) -> EndpointResolver {
        let client = Client::new();
        EndpointResolver::new(
            DoHClient::new("http://127.0.0.1:9/resolve", client.clone()),
            GeoLocator::with_base_url(client, "http://127.0.0.1:9/json"),
            sink,
            Arc::new(FixedSelection(String::new())),
        )
    }

    #[tokio::test]
    async fn test_choose_empty_host() {
        let sink = Arc::new(MemorySink::new());
        let endpoint = resolver(sink.clone())
            .choose(&CancelScope::new(), "", false)
            .await;

        assert!(!endpoint.is_set());
        assert_eq!(sink.events()[0], OutputEvent::Header("Endpoint Selection".into()));
        assert_eq!(
            sink.warnings(),
            vec!["Could not parse host from DL_URL. Skip endpoint selection.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_choose_falls_back_to_system_dns() {
        let sink = Arc::new(MemorySink::new());
        let endpoint = resolver(sink.clone())
            .choose(&CancelScope::new(), "127.0.0.1", false)
            .await;

        assert_eq!(endpoint, Endpoint::new("127.0.0.1", SYSTEM_DNS_DESC));
        assert_eq!(
            sink.warnings(),
            vec!["AliDNS DoH returned no IPv4 endpoint. Fallback to system DNS.".to_string()]
        );
        assert!(sink
            .infos()
            .contains(&"Selected endpoint: 127.0.0.1 (system DNS fallback)".to_string()));
    }

    #[tokio::test]
    async fn test_choose_cancelled_returns_default() {
        let sink = Arc::new(MemorySink::new());
        let scope = CancelScope::new();
        scope.cancel();

        let endpoint = resolver(sink.clone()).choose(&scope, "example.com", true).await;
        assert!(!endpoint.is_set());
        assert!(sink
            .warnings()
            .contains(&"Could not resolve endpoint IP, continue with default DNS.".to_string()));
    }
}
