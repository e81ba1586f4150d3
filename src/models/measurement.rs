//! Measurement data structures: endpoints, geolocation records and pass results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Transfer direction of a measurement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    /// Label used in progress lines and results
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Download => "Download",
            Direction::Upload => "Upload",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate server address with a human-readable annotation.
///
/// The default value (empty `ip`) means "no override, use default DNS".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
    pub desc: String,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            desc: desc.into(),
        }
    }

    /// Whether this endpoint carries an address override
    pub fn is_set(&self) -> bool {
        !self.ip.is_empty()
    }
}

/// Flattened ip-api.com geolocation record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpInfo {
    pub status: String,
    pub query: String,
    #[serde(rename = "as")]
    pub as_name: String,
    pub isp: String,
    pub org: String,
    pub city: String,
    #[serde(rename = "regionName")]
    pub region_name: String,
    pub country: String,
}

impl IpInfo {
    /// `City, Region, Country` with duplicates and blanks dropped
    pub fn location(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.city.is_empty() {
            parts.push(&self.city);
        }
        if !self.region_name.is_empty() && self.region_name != self.city {
            parts.push(&self.region_name);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        parts.join(", ")
    }

    /// AS string, falling back to the organisation
    pub fn network(&self) -> &str {
        if self.as_name.is_empty() {
            &self.org
        } else {
            &self.as_name
        }
    }
}

/// Aggregated outcome of one throughput pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub direction: Direction,
    pub threads: usize,
    pub total_bytes: i64,
    pub duration: Duration,
    pub mbps: f64,
    pub fault_count: usize,
    pub had_fault: bool,
}

impl TransferResult {
    /// Build a result, deriving `mbps` and `had_fault` from the raw counts.
    pub fn new(
        direction: Direction,
        threads: usize,
        total_bytes: i64,
        duration: Duration,
        fault_count: usize,
    ) -> Self {
        Self {
            direction,
            threads,
            total_bytes,
            duration,
            mbps: crate::units::mbps(total_bytes, duration.as_secs_f64()),
            fault_count,
            had_fault: fault_count > 0,
        }
    }
}
