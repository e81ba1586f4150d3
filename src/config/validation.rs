//! Non-fatal configuration checks

use crate::{error::Result, models::Config};

/// Configuration validator producing advisory warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run hard validation, then collect warnings about questionable settings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::check_urls(config));
        warnings.extend(Self::check_transfer_settings(config));
        Ok(warnings)
    }

    fn check_urls(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, value) in [("DL_URL", &config.dl_url), ("UL_URL", &config.ul_url)] {
            match url::Url::parse(value) {
                Ok(parsed) => {
                    if parsed.scheme() == "http" {
                        warnings.push(ValidationWarning::new(
                            ValidationLevel::Info,
                            format!("{} uses plain HTTP; middleboxes may alter throughput", name),
                        ));
                    }
                }
                Err(e) => warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("{} '{}' does not parse as a URL: {}", name, value, e),
                )),
            }
        }

        let dl_host = crate::endpoint::host_from_url(&config.dl_url);
        let ul_host = crate::endpoint::host_from_url(&config.ul_url);
        if !dl_host.is_empty() && !ul_host.is_empty() && dl_host != ul_host {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Upload host {} differs from download host {}; the selected endpoint only pins {}",
                    ul_host, dl_host, dl_host
                ),
            ));
        }

        warnings
    }

    fn check_transfer_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.max_bytes < 1_000_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "MAX of {} is very small; throughput will be dominated by connection setup",
                    crate::units::human_bytes(config.max_bytes)
                ),
            ));
        }

        if config.threads > 16 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} parallel workers may saturate the local host before the link", config.threads),
            ));
        }

        if config.timeout_seconds < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}s may end transfers before TCP ramps up", config.timeout_seconds),
            ));
        } else if config.timeout_seconds > 60 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long timeout of {}s; each pass may run up to {}s", config.timeout_seconds, config.timeout_seconds + 2),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self) -> String {
        format!("[{}] {}", self.level.as_str(), self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_warnings() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut config = Config::default();
        config.threads = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_plain_http_and_host_mismatch() {
        let mut config = Config::default();
        config.dl_url = "http://dl.example.com/large".to_string();
        config.ul_url = "https://ul.example.com/slurp".to_string();

        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("DL_URL uses plain HTTP")));
        assert!(warnings.iter().any(|w| w.message.contains("differs from download host")));
    }

    #[test]
    fn test_transfer_setting_warnings() {
        let mut config = Config::default();
        config.max_bytes = 1000;
        config.threads = 32;
        config.timeout_seconds = 2;

        let warnings = validate_config(&config).unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].format().starts_with("[WARNING] MAX of 1000 B"));
        assert_eq!(warnings[1].level, ValidationLevel::Info);
        assert!(warnings[2].message.contains("Timeout of 2s"));
    }
}
