//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the working directory if it exists.
    ///
    /// Variables already present in the process environment win.
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        let mut content = String::from(
            "# CDN Network Bench Configuration\n\
             #\n\
             # Values here are used when neither the command line nor the\n\
             # process environment sets them.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate a single environment variable value.
    ///
    /// Stricter than [`crate::models::Config::merge_from_lookup`], which
    /// silently ignores unparsable integers; used to surface warnings.
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "DL_URL" | "UL_URL" | "LATENCY_URL" => {
                url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", key, value, e)))?;
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(AppError::config(format!("{} must start with http(s)://", key)));
                }
            }
            "MAX" => {
                let bytes = crate::units::parse_size(value)
                    .map_err(|e| AppError::config(format!("Invalid MAX '{}': {}", value, e)))?;
                if bytes <= 0 {
                    return Err(AppError::config("MAX must be > 0"));
                }
            }
            "TIMEOUT" => Self::validate_range(key, value, 1, crate::defaults::MAX_TIMEOUT_SECS)?,
            "THREADS" => Self::validate_range(key, value, 1, crate::defaults::MAX_THREADS as u64)?,
            "LATENCY_COUNT" => {
                Self::validate_range(key, value, 1, crate::defaults::MAX_LATENCY_COUNT as u64)?
            }
            "ENABLE_COLOR" => {
                if crate::models::config::parse_flag(value).is_none() {
                    return Err(AppError::config(format!("Invalid ENABLE_COLOR value '{}'", value)));
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn validate_range(key: &str, value: &str, min: u64, max: u64) -> Result<()> {
        let n: u64 = value
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
        if n < min || n > max {
            return Err(AppError::config(format!(
                "{} must be between {} and {}, got: {}",
                key, min, max, n
            )));
        }
        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("DL_URL", "Download probe URL", crate::defaults::DEFAULT_DL_URL),
            ("UL_URL", "Upload probe URL", crate::defaults::DEFAULT_UL_URL),
            ("LATENCY_URL", "Latency probe URL", crate::defaults::DEFAULT_LATENCY_URL),
            ("MAX", "Per-worker byte cap (k/m/g/t decimal, kib/mib/gib/tib binary)", crate::defaults::DEFAULT_MAX),
            ("TIMEOUT", "Per-attempt timeout in seconds (1-120)", "10"),
            ("THREADS", "Parallel transfer workers (1-64)", "4"),
            ("LATENCY_COUNT", "Latency samples (1-100)", "20"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::from("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<14} {}\n", var, description));
            help.push_str(&format!("  {:<14} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Warnings for supported variables currently set to questionable values
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok().filter(|v| !v.is_empty())?;
                Self::validate_env_var(name, &value)
                    .err()
                    .map(|e| format!("{} (ignored or rejected): {}", name, e))
            })
            .collect()
    }
}
