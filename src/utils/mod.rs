//! Shared utilities: duration and data rate parsing, configuration validation.

pub mod duration;
pub mod rate;
pub mod validation;

pub use duration::parse_duration;
pub use rate::{parse_data_rate, DataRate};
pub use validation::{validate_attack_window, validate_topology_size};

/// Errors raised while parsing human-readable option values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    Duration(String),
    #[error("Invalid data rate format: {0}")]
    Rate(String),
}
