//! Command-line interface

use clap::Parser;

/// CDN Network Bench - parallel throughput and latency probe
///
/// Every option falls back to the matching environment variable
/// (DL_URL, UL_URL, LATENCY_URL, MAX, TIMEOUT, THREADS, LATENCY_COUNT),
/// then to a `.env` file, then to built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cnb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Download probe URL
    #[arg(long, value_name = "URL")]
    pub dl_url: Option<String>,

    /// Upload probe URL
    #[arg(long, value_name = "URL")]
    pub ul_url: Option<String>,

    /// Latency probe URL
    #[arg(long, value_name = "URL")]
    pub latency_url: Option<String>,

    /// Per-worker byte cap (e.g. 2G, 500M, 1GiB)
    #[arg(short, long, value_name = "SIZE")]
    pub max: Option<String>,

    /// Per-attempt timeout in seconds (1-120)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Parallel transfer workers (1-64)
    #[arg(short = 'n', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Latency samples (1-100)
    #[arg(short = 'c', long, value_name = "N")]
    pub latency_count: Option<u32>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output (structured JSON logs)
    #[arg(long)]
    pub debug: bool,

    /// Never prompt; pick the first endpoint
    #[arg(long)]
    pub no_prompt: bool,

    /// Skip endpoint selection and use default DNS
    #[arg(long)]
    pub skip_endpoint: bool,

    /// Skip the latency probe
    #[arg(long)]
    pub skip_latency: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
