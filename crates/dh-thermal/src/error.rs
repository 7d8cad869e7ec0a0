//! Error types for heat-loss computation.

use dh_core::DhError;
use dh_network::NetworkError;
use thiserror::Error;

pub type ThermalResult<T> = Result<T, ThermalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThermalError {
    #[error("Invalid heat-loss configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Invalid heat-loss input {what}: {value}")]
    InvalidInput { what: &'static str, value: f64 },

    #[error("Failed to fingerprint configuration: {0}")]
    Fingerprint(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<ThermalError> for DhError {
    fn from(e: ThermalError) -> Self {
        match e {
            ThermalError::Network(n) => n.into(),
            other => DhError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
