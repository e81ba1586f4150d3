//! Error handling for the CDN network bench
//!
//! Only configuration and setup problems surface as [`AppError`]. Failures
//! inside a measurement (unreachable resolvers, faulted workers, failed
//! geolocation) are reported as warnings or counters instead.

use colored::{Color, Colorize};
use thiserror::Error;

/// Errors that end a session
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid configuration (bad size, out-of-range value, bad URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// DNS resolution errors
    #[error("DNS resolution error: {0}")]
    DnsResolution(String),

    /// HTTP protocol errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Deadline expiry
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Terminal or env file I/O
    #[error("I/O error: {0}")]
    Io(String),

    /// Sizes, URLs, JSON
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Bugs
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn dns_resolution<S: Into<String>>(message: S) -> Self {
        Self::DnsResolution(message.into())
    }

    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Short tag used in console output and structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::DnsResolution(_) => "DNS",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// A rerun may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) | Self::Timeout(_)
        )
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// What the user can do about it
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Parse(_) => {
                "Check DL_URL, UL_URL, LATENCY_URL, MAX, TIMEOUT, THREADS and LATENCY_COUNT in the command line, the environment or .env. Sizes look like 512, 100M, 2G or 1GiB."
            }
            Self::Network(_) | Self::HttpRequest(_) => {
                "Check your connection, or point DL_URL/UL_URL at another probe server."
            }
            Self::DnsResolution(_) => {
                "Check that the probe host exists, or run with --skip-endpoint to use default DNS."
            }
            Self::Timeout(_) => "Raise --timeout (up to 120 seconds) or retry on a quieter link.",
            Self::Io(_) => "Check terminal access and file permissions.",
            Self::Internal(_) => "This is likely a bug. Please report it with the message above.",
        }
    }

    /// Message plus suggestion, for verbose error output
    pub fn user_friendly_message(&self) -> String {
        format!("{}\n\nSuggestion: {}", self, self.suggestion())
    }

    fn color(&self) -> Color {
        match self {
            Self::Config(_) | Self::Parse(_) => Color::Red,
            Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) => Color::Yellow,
            Self::Timeout(_) => Color::Blue,
            Self::Io(_) => Color::Cyan,
            Self::Internal(_) => Color::BrightRed,
        }
    }

    /// `[CATEGORY] message`, optionally colored by severity
    pub fn format_for_console(&self, use_color: bool) -> String {
        if use_color {
            let color = self.color();
            format!(
                "[{}] {}",
                self.category().color(color).bold(),
                self.to_string().color(color)
            )
        } else {
            format!("[{}] {}", self.category(), self)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("number parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<trust_dns_resolver::error::ResolveError> for AppError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        Self::dns_resolution(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Prints fatal errors on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error the way `report_error` prints it
    pub fn render(&self, error: &AppError) -> String {
        let mut out = format!("  [✗] {}", error.format_for_console(self.use_color));
        if !self.verbose {
            return out;
        }

        out.push_str("\n\n");
        out.push_str(&error.user_friendly_message());
        if error.is_recoverable() {
            let hint = "This error might be temporary. You can try running the command again.";
            out.push_str("\n\n");
            if self.use_color {
                out.push_str(&hint.green().to_string());
            } else {
                out.push_str(hint);
            }
        }
        out
    }

    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal_with_code_one() {
        let error = AppError::config("MAX must be > 0");
        assert_eq!(error.category(), "CONFIG");
        assert!(!error.is_recoverable());
        assert_eq!(error.exit_code(), 1);
        assert_eq!(AppError::parse("size").exit_code(), 1);
    }

    #[test]
    fn test_categories_and_exit_codes() {
        let cases = [
            (AppError::network("x"), "NETWORK", 2),
            (AppError::dns_resolution("x"), "DNS", 2),
            (AppError::http_request("x"), "HTTP", 2),
            (AppError::timeout("x"), "TIMEOUT", 3),
            (AppError::io("x"), "IO", 5),
            (AppError::internal("x"), "INTERNAL", 99),
        ];

        for (error, category, code) in cases {
            assert_eq!(error.category(), category);
            assert_eq!(error.exit_code(), code);
        }
    }

    #[test]
    fn test_user_friendly_message() {
        let message = AppError::config("THREADS must be <= 64").user_friendly_message();
        assert!(message.starts_with("Configuration error: THREADS must be <= 64"));
        assert!(message.contains("Suggestion: Check DL_URL"));
    }

    #[test]
    fn test_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no tty");
        assert_eq!(AppError::from(io_error).category(), "IO");

        let float_error = "1.2.3".parse::<f64>().unwrap_err();
        assert_eq!(AppError::from(float_error).category(), "PARSE");

        let url_error = url::Url::parse("not-a-valid-url").unwrap_err();
        assert!(AppError::from(url_error).to_string().contains("URL parse error"));

        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        assert_eq!(AppError::from(dotenv_error).exit_code(), 1);
    }

    #[test]
    fn test_reporter_render() {
        let reporter = ErrorReporter::new(false, true);
        let rendered = reporter.render(&AppError::timeout("probe"));
        assert!(rendered.starts_with("  [✗] [TIMEOUT]"));
        assert!(rendered.contains("Suggestion:"));
        assert!(rendered.contains("might be temporary"));

        let terse = ErrorReporter::new(false, false).render(&AppError::config("bad"));
        assert_eq!(terse, "  [✗] [CONFIG] Configuration error: bad");
    }

    #[test]
    fn test_anyhow_integration() {
        let error: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(error.category(), "INTERNAL");

        let wrapped = anyhow::anyhow!(AppError::config("bad size"));
        assert!(wrapped.to_string().contains("Configuration error"));
    }
}
