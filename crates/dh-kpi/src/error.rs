//! Error types for KPI extraction.

use dh_core::DhError;
use thiserror::Error;

pub type KpiResult<T> = Result<T, KpiError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KpiError {
    #[error("Network has no converged solver results")]
    NotConverged,

    #[error("Missing solver result for {what} '{name}'")]
    MissingResults { what: &'static str, name: String },

    #[error("Invalid KPI configuration: {what}")]
    InvalidConfig { what: String },
}

impl From<KpiError> for DhError {
    fn from(e: KpiError) -> Self {
        DhError::Invariant {
            what: e.to_string(),
        }
    }
}
