//! Error types at the solver boundary.

use dh_core::DhError;
use dh_network::NetworkError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by an external solver run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverError {
    #[error("Convergence failed: {what}")]
    NonConvergence { what: String },

    #[error("Solver rejected the network: {what}")]
    InvalidNetwork { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    /// The solver returned results that do not match the network.
    #[error("Invalid solver output: {what}")]
    InvalidOutput { what: String },

    /// Solver unavailable or crashed; topology repair cannot help.
    #[error("Solver backend error: {what}")]
    Backend { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    /// Whether topology repair may turn this failure into a success.
    pub fn is_repairable(&self) -> bool {
        match self {
            SolverError::NonConvergence { .. }
            | SolverError::InvalidNetwork { .. }
            | SolverError::Numeric { .. } => true,
            SolverError::InvalidOutput { .. } | SolverError::Backend { .. } => false,
        }
    }
}

impl From<NetworkError> for SolverError {
    fn from(e: NetworkError) -> Self {
        SolverError::InvalidOutput {
            what: e.to_string(),
        }
    }
}

impl From<SolverError> for DhError {
    fn from(e: SolverError) -> Self {
        DhError::Invariant {
            what: e.to_string(),
        }
    }
}
