//! Application service layer for the district-heating planner.
//!
//! Runs the planning pipeline per cluster or for a whole project in
//! parallel, drives an external solver through the repair loop, and
//! stores plans and KPI reports on disk. Shared by the CLI and tests.

pub mod batch;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod store;

pub use batch::{plan_batch, BatchItem};
pub use error::{AppError, AppResult, FailureKind};
pub use hash::config_hash;
pub use pipeline::{
    evaluate_network, plan_cluster, simulate_cluster, ClusterPlan, ClusterSimulation, PlanInput,
    PlanStats,
};
pub use store::{read_network, PlanManifest, PlanStore};

/// Version recorded in plan manifests.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
