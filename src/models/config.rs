//! Configuration data model and validation

use crate::error::{AppError, Result};
use crate::units::parse_size;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Download probe URL
    #[serde(default = "default_dl_url")]
    pub dl_url: String,

    /// Upload probe URL
    #[serde(default = "default_ul_url")]
    pub ul_url: String,

    /// Small-object URL used for latency sampling
    #[serde(default = "default_latency_url")]
    pub latency_url: String,

    /// Per-worker byte cap as written by the user (e.g. "2G")
    #[serde(default = "default_max")]
    pub max: String,

    /// `max` in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: i64,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Parallel transfer workers per pass
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Number of latency samples
    #[serde(default = "default_latency_count")]
    pub latency_count: u32,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Allow prompting on a terminal
    #[serde(default = "default_interactive")]
    pub interactive: bool,

    /// Skip endpoint selection and use default DNS
    #[serde(default)]
    pub skip_endpoint: bool,

    /// Skip the latency probe
    #[serde(default)]
    pub skip_latency: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dl_url: default_dl_url(),
            ul_url: default_ul_url(),
            latency_url: default_latency_url(),
            max: default_max(),
            max_bytes: default_max_bytes(),
            timeout_seconds: default_timeout_secs(),
            threads: default_threads(),
            latency_count: default_latency_count(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            interactive: default_interactive(),
            skip_endpoint: false,
            skip_latency: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Re-derive `max_bytes` from the `max` string.
    pub fn apply_max(&mut self) -> Result<()> {
        self.max_bytes = parse_size(&self.max)
            .map_err(|e| AppError::config(format!("invalid MAX {:?}: {}", self.max, e)))?;
        Ok(())
    }

    /// Validate the configuration and return the first violation
    pub fn validate(&self) -> Result<()> {
        if self.max_bytes <= 0 {
            return Err(AppError::config("MAX must be > 0"));
        }
        if self.timeout_seconds == 0 {
            return Err(AppError::config("TIMEOUT must be > 0"));
        }
        if self.threads == 0 {
            return Err(AppError::config("THREADS must be > 0"));
        }
        if self.latency_count == 0 {
            return Err(AppError::config("LATENCY_COUNT must be > 0"));
        }
        if self.timeout_seconds > crate::defaults::MAX_TIMEOUT_SECS {
            return Err(AppError::config(format!(
                "TIMEOUT must be <= {}",
                crate::defaults::MAX_TIMEOUT_SECS
            )));
        }
        if self.threads > crate::defaults::MAX_THREADS {
            return Err(AppError::config(format!(
                "THREADS must be <= {}",
                crate::defaults::MAX_THREADS
            )));
        }
        if self.latency_count > crate::defaults::MAX_LATENCY_COUNT {
            return Err(AppError::config(format!(
                "LATENCY_COUNT must be <= {}",
                crate::defaults::MAX_LATENCY_COUNT
            )));
        }

        for (name, value) in [
            ("DL_URL", &self.dl_url),
            ("UL_URL", &self.ul_url),
            ("LATENCY_URL", &self.latency_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(AppError::config(format!("{} must start with http(s)://", name)));
            }
        }

        Ok(())
    }

    /// Merge process environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge variables from an arbitrary lookup.
    ///
    /// Empty values count as unset. Integers that fail to parse keep the
    /// current value; negative integers are stored as zero so that
    /// [`Config::validate`] rejects them.
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("DL_URL") {
            self.dl_url = v;
        }
        if let Some(v) = get("UL_URL") {
            self.ul_url = v;
        }
        if let Some(v) = get("LATENCY_URL") {
            self.latency_url = v;
        }
        if let Some(v) = get("MAX") {
            self.max = v;
        }
        if let Some(n) = get("TIMEOUT").and_then(|v| v.trim().parse::<i64>().ok()) {
            self.timeout_seconds = n.max(0) as u64;
        }
        if let Some(n) = get("THREADS").and_then(|v| v.trim().parse::<i64>().ok()) {
            self.threads = n.max(0) as usize;
        }
        if let Some(n) = get("LATENCY_COUNT").and_then(|v| v.trim().parse::<i64>().ok()) {
            self.latency_count = n.clamp(0, u32::MAX as i64) as u32;
        }
        if let Some(flag) = get("ENABLE_COLOR").and_then(|v| parse_flag(&v)) {
            self.enable_color = flag;
        }

        Ok(())
    }

    /// One-line summary shown at session start
    pub fn summary(&self) -> String {
        format!(
            "timeout={}s  max={}  threads={}  latency_count={}",
            self.timeout_seconds, self.max, self.threads, self.latency_count
        )
    }
}

/// Parse a boolean-ish environment flag
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Default value functions for serde
fn default_dl_url() -> String {
    crate::defaults::DEFAULT_DL_URL.to_string()
}

fn default_ul_url() -> String {
    crate::defaults::DEFAULT_UL_URL.to_string()
}

fn default_latency_url() -> String {
    crate::defaults::DEFAULT_LATENCY_URL.to_string()
}

fn default_max() -> String {
    crate::defaults::DEFAULT_MAX.to_string()
}

fn default_max_bytes() -> i64 {
    crate::defaults::DEFAULT_MAX_BYTES
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_threads() -> usize {
    crate::defaults::DEFAULT_THREADS
}

fn default_latency_count() -> u32 {
    crate::defaults::DEFAULT_LATENCY_COUNT
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_interactive() -> bool {
    true
}
