//! dh-kpi: EN 13941-1-style compliance report from converged results.
//!
//! `extract_kpis` refuses networks without converged solver results and
//! produces a `KpiReport` whose serialized field names are stable.

pub mod config;
pub mod error;
pub mod extract;
pub mod report;

pub use config::KpiConfig;
pub use error::{KpiError, KpiResult};
pub use extract::{extract_kpis, KpiContext};
pub use report::*;
