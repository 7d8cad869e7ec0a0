//! KPI compliance limits and warning thresholds.

use dh_core::units::{mps, Velocity};
use serde::{Deserialize, Serialize};

use crate::error::{KpiError, KpiResult};

/// Compliance limits and warning thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    pub velocity_limit_m_s: f64,
    /// Share of pipes that must stay within the velocity limit
    pub velocity_share_threshold: f64,
    /// Worst allowed pressure drop (bar per 100 m)
    pub max_dp_bar_per_100m: f64,
    /// Warn when losses exceed this share of delivered plus lost heat
    pub high_loss_share: f64,
    /// Warn when the fastest pipe runs above this fraction of the limit
    pub velocity_warning_fraction: f64,
    pub pump_efficiency: f64,
    /// Emit per-element tables
    pub detailed: bool,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            velocity_limit_m_s: 1.5,
            velocity_share_threshold: 0.95,
            max_dp_bar_per_100m: 0.3,
            high_loss_share: 0.15,
            velocity_warning_fraction: 0.9,
            pump_efficiency: 0.7,
            detailed: false,
        }
    }
}

impl KpiConfig {
    pub fn velocity_limit(&self) -> Velocity {
        mps(self.velocity_limit_m_s)
    }

    pub fn validate(&self) -> KpiResult<()> {
        let checks = [
            ("velocity limit", self.velocity_limit_m_s > 0.0),
            (
                "velocity share threshold",
                (0.0..=1.0).contains(&self.velocity_share_threshold),
            ),
            ("pressure drop ceiling", self.max_dp_bar_per_100m > 0.0),
            ("high loss share", (0.0..=1.0).contains(&self.high_loss_share)),
            (
                "velocity warning fraction",
                self.velocity_warning_fraction > 0.0 && self.velocity_warning_fraction <= 1.0,
            ),
            (
                "pump efficiency",
                self.pump_efficiency > 0.0 && self.pump_efficiency <= 1.0,
            ),
        ];
        match checks.iter().find(|(_, ok)| !ok) {
            Some((what, _)) => Err(KpiError::InvalidConfig {
                what: format!("{what} out of range"),
            }),
            None => Ok(()),
        }
    }
}
