//! CDN Network Bench
//!
//! Measures download/upload throughput and round-trip latency against
//! CDN network-quality endpoints. Before measuring, the probe host is
//! resolved over DNS-over-HTTPS (with system DNS as fallback), candidate
//! addresses are annotated with their location, and one is pinned for
//! the session.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod dns;
pub mod endpoint;
pub mod error;
pub mod latency;
pub mod logging;
pub mod models;
pub mod output;
pub mod transfer;
pub mod units;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, Direction, Endpoint, IpInfo, TransferResult};
pub use output::{OutputFactory, OutputSink, PlainRenderer, TerminalRenderer};
pub use transfer::{CancelScope, ThroughputEngine};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// `commit target (built time)`, stamped by the build script
pub fn build_info() -> String {
    format!(
        "{} {} (built {})",
        env!("GIT_COMMIT"),
        env!("TARGET_TRIPLE"),
        env!("BUILD_TIME")
    )
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_DL_URL: &str = "https://mensura.cdn-apple.com/api/v1/gm/large";
    pub const DEFAULT_UL_URL: &str = "https://mensura.cdn-apple.com/api/v1/gm/slurp";
    pub const DEFAULT_LATENCY_URL: &str = "https://mensura.cdn-apple.com/api/v1/gm/small";
    pub const DEFAULT_MAX: &str = "2G";
    pub const DEFAULT_MAX_BYTES: i64 = 2_000_000_000;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_THREADS: usize = 4;
    pub const DEFAULT_LATENCY_COUNT: u32 = 20;
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MAX_TIMEOUT_SECS: u64 = 120;
    pub const MAX_THREADS: usize = 64;
    pub const MAX_LATENCY_COUNT: u32 = 100;

    /// Client signature sent with every probe request
    pub const USER_AGENT: &str = "networkQuality/194.80.3 CFNetwork/3860.400.51 Darwin/25.3.0";

    pub const DOH_RESOLVE_URL: &str = "https://dns.alidns.com/resolve";
    pub const GEO_API_BASE: &str = "http://ip-api.com/json";

    pub const DOH_TIMEOUT: Duration = Duration::from_secs(5);
    pub const GEO_TIMEOUT: Duration = Duration::from_secs(4);
    pub const SELF_INFO_TIMEOUT: Duration = Duration::from_secs(5);

    pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
    /// Added to the per-attempt timeout to bound a whole pass
    pub const BACKSTOP_GRACE: Duration = Duration::from_secs(2);
    pub const CHUNK_SIZE: usize = 256 * 1024;
}
