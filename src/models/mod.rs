//! Data models and structures for the CDN network bench

pub mod config;
pub mod measurement;

// Re-export main model types
pub use config::Config;
pub use measurement::{Direction, Endpoint, IpInfo, TransferResult};
