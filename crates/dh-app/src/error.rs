//! Error types for the dh-app service layer.

use std::path::PathBuf;

use dh_kpi::KpiError;
use serde::{Deserialize, Serialize};

/// Coarse failure classes reported to callers and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad project data or configuration
    Input,
    /// No usable trunk could be produced
    Topology,
    /// The external solver did not deliver a usable result
    Solver,
    /// An operation was called on data in the wrong state
    Precondition,
    Internal,
}

/// Application error wrapping the backend crates' errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("Topology error: {0}")]
    Topology(#[from] dh_graph::TopologyError),

    #[error("Network assembly error: {0}")]
    Network(#[from] dh_network::NetworkError),

    #[error("Sizing error: {0}")]
    Sizing(#[from] dh_sizing::SizingError),

    #[error("Heat loss error: {0}")]
    Thermal(#[from] dh_thermal::ThermalError),

    #[error("Solver error: {0}")]
    Solver(#[from] dh_solver::SolverError),

    #[error("Cluster {cluster} did not converge after {solver_calls} solver calls: {reason}")]
    NonConvergence {
        cluster: String,
        solver_calls: usize,
        reason: String,
    },

    #[error("KPI error: {0}")]
    Kpi(#[from] KpiError),

    #[error("Results error: {0}")]
    Results(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::Project(_)
            | AppError::FileRead { .. }
            | AppError::ClusterNotFound(_)
            | AppError::Sizing(_)
            | AppError::Thermal(_) => FailureKind::Input,
            AppError::Topology(_) => FailureKind::Topology,
            AppError::Network(dh_network::NetworkError::Topology(_)) => FailureKind::Topology,
            AppError::Solver(_) | AppError::NonConvergence { .. } => FailureKind::Solver,
            AppError::Kpi(KpiError::NotConverged) => FailureKind::Precondition,
            AppError::Kpi(KpiError::MissingResults { .. }) => FailureKind::Precondition,
            AppError::Kpi(KpiError::InvalidConfig { .. }) => FailureKind::Input,
            AppError::Network(_) | AppError::Results(_) | AppError::Json(_) | AppError::Io(_) => {
                FailureKind::Internal
            }
        }
    }
}

impl From<dh_project::ProjectError> for AppError {
    fn from(err: dh_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<dh_project::ValidationError> for AppError {
    fn from(err: dh_project::ValidationError) -> Self {
        AppError::Project(err.to_string())
    }
}
