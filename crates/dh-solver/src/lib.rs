//! dh-solver: the boundary to the external hydraulic/thermal solver.
//!
//! The nonlinear solve itself happens elsewhere; this crate owns
//! - the `Solver` trait and its `SolverError`
//! - topology diagnostics (consumer/tee degree, trunk degree bound,
//!   connectivity, suspiciously uniform service lengths)
//! - `run_with_repair`: topology fix-ups on failure and boundary escalation
//!   on sub-floor pressures, always ending in a `SimulationOutcome`

pub mod boundary;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod repair;

pub use boundary::Solver;
pub use config::RepairConfig;
pub use diagnose::{detached_components, diagnose, TopologyIssue};
pub use error::{SolverError, SolverResult};
pub use repair::{
    run_with_repair, RepairAction, RepairLogEntry, RepairStage, SimulationOutcome,
};
