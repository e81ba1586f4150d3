//! Text formatting for measurement results

use crate::latency::LatencyStats;
use crate::models::{Endpoint, IpInfo, TransferResult};
use crate::units::human_bytes;

/// Renders results as single display lines.
///
/// Colors are left to the sink; the formatter only produces text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFormatter {
    verbose: bool,
}

impl ResultFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// One line per throughput pass
    pub fn format_transfer(&self, result: &TransferResult) -> String {
        let mut line = format!(
            "{:<8} {:>8.1} Mbps  {} in {:.1}s  ({} threads)",
            result.direction.label(),
            result.mbps,
            human_bytes(result.total_bytes),
            result.duration.as_secs_f64(),
            result.threads
        );

        if self.verbose {
            line.push_str(&format!("  [{} bytes]", result.total_bytes));
        }

        if result.had_fault {
            line.push_str(&format!(
                "  {}/{} worker(s) faulted",
                result.fault_count, result.threads
            ));
        }

        line
    }

    /// Latency summary over the successful samples
    pub fn format_latency(&self, stats: &LatencyStats) -> String {
        if stats.samples.is_empty() {
            return format!("Latency  no successful samples ({} failed)", stats.failures);
        }

        let mut line = format!(
            "Latency  min {:.1} ms  avg {:.1} ms  median {:.1} ms  max {:.1} ms  jitter {:.1} ms",
            stats.min_ms(),
            stats.avg_ms(),
            stats.median_ms(),
            stats.max_ms(),
            stats.jitter_ms()
        );

        if stats.failures > 0 {
            line.push_str(&format!("  ({}/{} failed)", stats.failures, stats.attempts()));
        }

        line
    }

    /// `Client: 1.2.3.4  Tokyo, Japan (AS1234 Example)`
    pub fn format_connection(&self, label: &str, info: &IpInfo) -> String {
        let address = if info.query.is_empty() { "unknown" } else { &info.query };
        let location = info.location();
        let location = if location.is_empty() { "unknown location" } else { &location };

        let mut line = format!("{}: {}  {}", label, address, location);
        let network = info.network();
        if !network.is_empty() {
            line.push_str(&format!(" ({})", network));
        }
        if self.verbose && !info.isp.is_empty() {
            line.push_str(&format!("  isp={}", info.isp));
        }
        line
    }

    /// Session target line
    pub fn format_endpoint(&self, endpoint: &Endpoint) -> String {
        if endpoint.is_set() {
            format!("Endpoint: {} ({})", endpoint.ip, endpoint.desc)
        } else {
            "Endpoint: default DNS".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use std::time::Duration;

    #[test]
    fn test_format_transfer() {
        let formatter = ResultFormatter::default();
        let result = TransferResult::new(Direction::Download, 4, 125_000_000, Duration::from_secs(10), 0);
        assert_eq!(
            formatter.format_transfer(&result),
            "Download    100.0 Mbps  119.2 MiB in 10.0s  (4 threads)"
        );
    }

    #[test]
    fn test_format_transfer_with_faults() {
        let formatter = ResultFormatter::new(true);
        let result = TransferResult::new(Direction::Upload, 4, 0, Duration::from_secs(2), 4);
        let line = formatter.format_transfer(&result);
        assert!(line.starts_with("Upload"));
        assert!(line.contains("[0 bytes]"));
        assert!(line.ends_with("4/4 worker(s) faulted"));
    }

    #[test]
    fn test_format_latency() {
        let formatter = ResultFormatter::default();
        let stats = LatencyStats::from_samples(
            vec![Duration::from_millis(10), Duration::from_millis(20), Duration::from_millis(30)],
            1,
        );
        let line = formatter.format_latency(&stats);
        assert!(line.contains("min 10.0 ms"));
        assert!(line.contains("median 20.0 ms"));
        assert!(line.ends_with("(1/4 failed)"));

        let empty = LatencyStats::from_samples(Vec::new(), 3);
        assert_eq!(formatter.format_latency(&empty), "Latency  no successful samples (3 failed)");
    }

    #[test]
    fn test_format_connection_and_endpoint() {
        let formatter = ResultFormatter::default();
        let info = IpInfo {
            query: "1.2.3.4".into(),
            city: "Tokyo".into(),
            region_name: "Tokyo".into(),
            country: "Japan".into(),
            as_name: "AS1234 Example".into(),
            ..Default::default()
        };
        assert_eq!(
            formatter.format_connection("Server", &info),
            "Server: 1.2.3.4  Tokyo, Japan (AS1234 Example)"
        );
        assert_eq!(
            formatter.format_connection("Client", &IpInfo::default()),
            "Client: unknown  unknown location"
        );

        assert_eq!(formatter.format_endpoint(&Endpoint::default()), "Endpoint: default DNS");
        assert_eq!(
            formatter.format_endpoint(&Endpoint::new("1.2.3.4", "Tokyo, Japan")),
            "Endpoint: 1.2.3.4 (Tokyo, Japan)"
        );
    }
}
