//! Sequential round-trip latency sampling

use crate::client::probe_headers;
use crate::logging::NetworkLogger;
use crate::output::OutputSink;
use crate::transfer::CancelScope;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Successful round-trip times in request order, plus the failure count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    pub samples: Vec<Duration>,
    pub failures: u32,
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl LatencyStats {
    pub fn from_samples(samples: Vec<Duration>, failures: u32) -> Self {
        Self { samples, failures }
    }

    pub fn attempts(&self) -> u32 {
        self.samples.len() as u32 + self.failures
    }

    pub fn min_ms(&self) -> f64 {
        self.samples.iter().copied().min().map_or(0.0, ms)
    }

    pub fn max_ms(&self) -> f64 {
        self.samples.iter().copied().max().map_or(0.0, ms)
    }

    pub fn avg_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().copied().map(ms).sum::<f64>() / self.samples.len() as f64
    }

    pub fn median_ms(&self) -> f64 {
        let mut sorted: Vec<f64> = self.samples.iter().copied().map(ms).collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Mean absolute difference between consecutive samples
    pub fn jitter_ms(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let diffs: f64 = self
            .samples
            .windows(2)
            .map(|pair| (ms(pair[1]) - ms(pair[0])).abs())
            .sum();
        diffs / (self.samples.len() - 1) as f64
    }
}

/// Issues `count` GETs one after another and times each to the last body byte
pub struct LatencyProbe {
    client: Client,
    url: String,
    count: u32,
    timeout: Duration,
    sink: Arc<dyn OutputSink>,
    logger: Option<NetworkLogger>,
}

impl LatencyProbe {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        count: u32,
        timeout: Duration,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            count,
            timeout,
            sink,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: NetworkLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Collect samples; stops early when `scope` is cancelled
    pub async fn run(&self, scope: &CancelScope) -> LatencyStats {
        let mut stats = LatencyStats::default();

        for i in 1..=self.count {
            if scope.is_cancelled() {
                break;
            }

            match scope.run(self.sample()).await {
                Some(Some(rtt)) => {
                    stats.samples.push(rtt);
                    self.sink
                        .progress("Latency", &format!("{}/{}  {:.1} ms", i, self.count, ms(rtt)));
                }
                Some(None) => stats.failures += 1,
                None => break,
            }
        }

        stats
    }

    async fn sample(&self) -> Option<Duration> {
        let started = Instant::now();
        let request = async {
            let response = self.client.get(&self.url).headers(probe_headers()).send().await.ok()?;
            let status = response.status().as_u16();
            response.bytes().await.ok()?;
            Some(status)
        };

        let status = tokio::time::timeout(self.timeout, request).await.ok().flatten();
        let elapsed = started.elapsed();

        if let Some(logger) = &self.logger {
            logger.log_http_request(&self.url, "GET", status, ms(elapsed)).await;
        }

        match status {
            Some(code) if code < 400 => Some(elapsed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;

    fn millis(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|v| Duration::from_millis(*v)).collect()
    }

    #[test]
    fn test_stats_basic() {
        let stats = LatencyStats::from_samples(millis(&[30, 10, 20, 40]), 2);
        assert_eq!(stats.attempts(), 6);
        assert_eq!(stats.min_ms(), 10.0);
        assert_eq!(stats.max_ms(), 40.0);
        assert_eq!(stats.avg_ms(), 25.0);
        assert_eq!(stats.median_ms(), 25.0);
        // |10-30| + |20-10| + |40-20| = 50 over 3 gaps
        assert!((stats.jitter_ms() - 50.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_odd_median_and_single_sample() {
        assert_eq!(LatencyStats::from_samples(millis(&[5, 1, 3]), 0).median_ms(), 3.0);

        let single = LatencyStats::from_samples(millis(&[7]), 0);
        assert_eq!(single.jitter_ms(), 0.0);
        assert_eq!(single.median_ms(), 7.0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = LatencyStats::default();
        assert_eq!(stats.min_ms(), 0.0);
        assert_eq!(stats.avg_ms(), 0.0);
        assert_eq!(stats.median_ms(), 0.0);
        assert_eq!(stats.attempts(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_url_counts_failures() {
        let sink = Arc::new(MemorySink::new());
        let probe = LatencyProbe::new(
            Client::new(),
            "http://127.0.0.1:9/small",
            3,
            Duration::from_secs(1),
            sink.clone(),
        );

        let stats = probe.run(&CancelScope::new()).await;
        assert!(stats.samples.is_empty());
        assert_eq!(stats.failures, 3);
        assert_eq!(sink.progress_count("Latency"), 0);
    }

    #[tokio::test]
    async fn test_cancelled_probe_takes_no_samples() {
        let scope = CancelScope::new();
        scope.cancel();
        let probe = LatencyProbe::new(
            Client::new(),
            "http://127.0.0.1:9/small",
            5,
            Duration::from_secs(1),
            Arc::new(MemorySink::new()),
        );
        assert_eq!(probe.run(&scope).await, LatencyStats::default());
    }
}
