//! Main application orchestration and execution

use crate::{
    client::ClientFactory,
    config::{display_config_summary, validate_config},
    dns::DoHClient,
    endpoint::{default_input, host_from_url, EndpointResolver, GeoLocator, SelectionInput},
    error::Result,
    latency::{LatencyProbe, LatencyStats},
    logging::{Logger, LoggerFactory, NetworkLogger, TransferLogger},
    models::{Config, Direction, Endpoint, TransferResult},
    output::{OutputFactory, OutputSink, ResultFormatter},
    transfer::{CancelScope, ThroughputEngine},
};
use std::sync::Arc;

/// Everything one session measured
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub endpoint: Endpoint,
    pub latency: Option<LatencyStats>,
    pub download: TransferResult,
    pub upload: TransferResult,
    /// The session was cut short by cancellation
    pub interrupted: bool,
}

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    sink: Arc<dyn OutputSink>,
    logger: Logger,
    input: Arc<dyn SelectionInput>,
    interactive: bool,
    doh_url: String,
    geo_base: String,
}

impl App {
    /// Create an application writing to the terminal
    pub async fn new(config: Config) -> Result<Self> {
        let logger = LoggerFactory::new(config.clone()).create_logger("APP").await;
        let sink = OutputFactory::create(config.enable_color);
        let interactive = config.interactive && OutputFactory::is_tty();
        let input = default_input(config.enable_color);

        Ok(Self {
            config,
            sink,
            logger,
            input,
            interactive,
            doh_url: crate::defaults::DOH_RESOLVE_URL.to_string(),
            geo_base: crate::defaults::GEO_API_BASE.to_string(),
        })
    }

    /// Replace the output sink
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the endpoint prompt and force interactivity on or off
    pub fn with_selection_input(mut self, input: Arc<dyn SelectionInput>, interactive: bool) -> Self {
        self.input = input;
        self.interactive = interactive;
        self
    }

    /// Point DoH and geolocation lookups at other servers
    pub fn with_lookup_services(mut self, doh_url: impl Into<String>, geo_base: impl Into<String>) -> Self {
        self.doh_url = doh_url.into();
        self.geo_base = geo_base.into();
        self
    }

    /// Run a full session: endpoint, connection info, latency, download, upload.
    ///
    /// Cancelling `scope` skips the remaining steps but still reports
    /// what was measured.
    pub async fn run(&self, scope: &CancelScope) -> Result<SessionReport> {
        let config = &self.config;
        let formatter = ResultFormatter::new(config.verbose);

        self.sink.header(&format!("CDN Network Bench v{}", crate::VERSION));
        self.sink.info(&config.summary());
        if config.debug {
            self.sink.info(&format!("Build: {}", crate::build_info()));
            for line in display_config_summary(config).lines() {
                self.sink.info(line);
            }
        }
        for warning in validate_config(config)? {
            self.sink.warn(&warning.format());
        }

        let lookup_client = ClientFactory::new().create_lookup_client()?;
        let geo = GeoLocator::with_base_url(lookup_client.clone(), self.geo_base.clone());
        let net_logger = NetworkLogger::new(&self.logger);

        let host = host_from_url(&config.dl_url);
        let endpoint = if config.skip_endpoint {
            self.sink.info("Endpoint selection skipped, using default DNS.");
            Endpoint::default()
        } else {
            EndpointResolver::new(
                DoHClient::new(self.doh_url.clone(), lookup_client),
                geo.clone(),
                Arc::clone(&self.sink),
                Arc::clone(&self.input),
            )
            .with_logger(net_logger.clone())
            .choose(scope, &host, self.interactive)
            .await
        };

        crate::log_info!(
            self.logger,
            "Probing {} via {}",
            host,
            if endpoint.is_set() { endpoint.ip.as_str() } else { "default DNS" }
        );

        let probe_client = ClientFactory::new()
            .with_endpoint(&host, &endpoint)
            .with_connect_timeout(config.timeout())
            .create_probe_client()?;

        if !scope.is_cancelled() {
            self.sink.header("Connection");
            if let Some(client_info) = scope.run(geo.fetch_info("")).await {
                self.sink.info(&formatter.format_connection("Client", &client_info));
            }
            if endpoint.is_set() {
                if let Some(server_info) = scope.run(geo.fetch_info(&endpoint.ip)).await {
                    self.sink.info(&formatter.format_connection("Server", &server_info));
                }
            }
        }

        let latency = if config.skip_latency || scope.is_cancelled() {
            None
        } else {
            self.sink.header("Latency");
            let stats = LatencyProbe::new(
                probe_client.clone(),
                config.latency_url.clone(),
                config.latency_count,
                config.timeout(),
                Arc::clone(&self.sink),
            )
            .with_logger(net_logger)
            .run(scope)
            .await;
            self.sink.result(&formatter.format_latency(&stats));
            Some(stats)
        };

        let engine = ThroughputEngine::new(probe_client, config, Arc::clone(&self.sink))
            .with_logger(TransferLogger::new(&self.logger));

        self.sink.header("Download");
        let download = engine
            .run(scope, Direction::Download, config.threads, &config.dl_url)
            .await;
        self.sink.result(&formatter.format_transfer(&download));

        self.sink.header("Upload");
        let upload = engine
            .run(scope, Direction::Upload, config.threads, &config.ul_url)
            .await;
        self.sink.result(&formatter.format_transfer(&upload));

        let report = SessionReport {
            endpoint,
            latency,
            download,
            upload,
            interrupted: scope.is_cancelled(),
        };
        self.summarize(&report, &formatter);
        Ok(report)
    }

    fn summarize(&self, report: &SessionReport, formatter: &ResultFormatter) {
        self.sink.header("Summary");
        self.sink.info(&formatter.format_endpoint(&report.endpoint));
        if let Some(stats) = &report.latency {
            self.sink.result(&formatter.format_latency(stats));
        }
        self.sink.result(&formatter.format_transfer(&report.download));
        self.sink.result(&formatter.format_transfer(&report.upload));
        if report.interrupted {
            self.sink.warn("Interrupted; results are partial.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::FixedSelection;
    use crate::output::{MemorySink, OutputEvent};

    #[tokio::test]
    async fn test_cancelled_session_still_reports() {
        let config = Config {
            dl_url: "http://127.0.0.1:9/large".into(),
            ul_url: "http://127.0.0.1:9/slurp".into(),
            latency_url: "http://127.0.0.1:9/small".into(),
            timeout_seconds: 1,
            skip_endpoint: true,
            ..Default::default()
        };
        let sink = Arc::new(MemorySink::new());
        let app = App::new(config)
            .await
            .unwrap()
            .with_sink(sink.clone())
            .with_selection_input(Arc::new(FixedSelection(String::new())), false);

        let scope = CancelScope::new();
        scope.cancel();
        let report = app.run(&scope).await.unwrap();

        assert!(report.interrupted);
        assert!(report.latency.is_none());
        assert!(!report.endpoint.is_set());
        assert_eq!(report.download.total_bytes, 0);
        assert_eq!(report.upload.fault_count, 4);

        let events = sink.events();
        assert!(events.contains(&OutputEvent::Header("Summary".into())));
        assert!(sink
            .warnings()
            .contains(&"Interrupted; results are partial.".to_string()));
    }
}
