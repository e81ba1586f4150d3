//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
    load_env_file: bool,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            load_env_file: true,
        }
    }

    /// Do not read `.env` from the working directory
    pub fn without_env_file(mut self) -> Self {
        self.load_env_file = false;
        self
    }

    /// Parse and build the complete configuration from the process environment
    pub fn parse(&self) -> Result<Config> {
        if self.load_env_file {
            EnvManager::load_env_file(self.cli.debug)?;
        }
        self.parse_with(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an explicit variable lookup
    pub fn parse_with<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.merge_from_lookup(lookup)?;
        self.apply_cli_overrides(&mut config);
        config.apply_max()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(url) = &cli.dl_url {
            config.dl_url = url.clone();
        }
        if let Some(url) = &cli.ul_url {
            config.ul_url = url.clone();
        }
        if let Some(url) = &cli.latency_url {
            config.latency_url = url.clone();
        }
        if let Some(max) = &cli.max {
            config.max = max.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(threads) = cli.threads {
            config.threads = threads;
        }
        if let Some(count) = cli.latency_count {
            config.latency_count = count;
        }
        if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only switches
        config.verbose = cli.verbose;
        config.debug = cli.debug;
        config.interactive = !cli.no_prompt;
        config.skip_endpoint = cli.skip_endpoint;
        config.skip_latency = cli.skip_latency;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Multi-line configuration dump for debug output
pub fn display_config_summary(config: &Config) -> String {
    [
        format!("DL_URL: {}", config.dl_url),
        format!("UL_URL: {}", config.ul_url),
        format!("LATENCY_URL: {}", config.latency_url),
        format!("MAX: {} ({} bytes)", config.max, config.max_bytes),
        format!("TIMEOUT: {}s", config.timeout_seconds),
        format!("THREADS: {}", config.threads),
        format!("LATENCY_COUNT: {}", config.latency_count),
        format!("Color Output: {}", config.enable_color),
        format!("Interactive: {}", config.interactive),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let parser = ConfigParser::new(Cli::parse_from(["cnb"]));
        let config = parser.parse_with(vars(&[])).unwrap();

        assert_eq!(config.dl_url, crate::defaults::DEFAULT_DL_URL);
        assert_eq!(config.max_bytes, 2_000_000_000);
        assert_eq!(config.threads, 4);
        assert!(config.interactive);
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let cli = Cli::parse_from(["cnb", "--threads", "12", "--max", "1MiB", "--no-prompt"]);
        let config = ConfigParser::new(cli)
            .parse_with(vars(&[("THREADS", "8"), ("MAX", "5G"), ("TIMEOUT", "7")]))
            .unwrap();

        assert_eq!(config.threads, 12);
        assert_eq!(config.max, "1MiB");
        assert_eq!(config.max_bytes, 1_048_576);
        assert_eq!(config.timeout_seconds, 7);
        assert!(!config.interactive);
    }

    #[test]
    fn test_invalid_max_from_env_is_rejected() {
        let parser = ConfigParser::new(Cli::parse_from(["cnb"]));
        let err = parser.parse_with(vars(&[("MAX", "12 parsecs")])).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("invalid MAX"));
    }

    #[test]
    fn test_out_of_range_cli_value_is_rejected() {
        let parser = ConfigParser::new(Cli::parse_from(["cnb", "--timeout", "500"]));
        let err = parser.parse_with(vars(&[])).unwrap_err();
        assert!(err.to_string().contains("TIMEOUT must be <= 120"));
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("DL_URL: https://mensura.cdn-apple.com/api/v1/gm/large"));
        assert!(summary.contains("MAX: 2G (2000000000 bytes)"));
        assert!(summary.contains("THREADS: 4"));
    }
}
