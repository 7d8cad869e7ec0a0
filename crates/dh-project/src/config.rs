//! Aggregate planning configuration.

use dh_core::WaterProps;
use dh_graph::{SpurConfig, TrunkConfig};
use dh_kpi::KpiConfig;
use dh_network::NetworkConfig;
use dh_sizing::SizingConfig;
use dh_solver::RepairConfig;
use dh_thermal::HeatLossConfig;
use serde::{Deserialize, Serialize};

/// Every tunable of one planning run. Missing sections take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Projected coordinate reference system of all geometry (metres)
    pub crs: String,
    /// Trunk synthesis, including the coordinate snap tolerance
    pub trunk: TrunkConfig,
    pub spur: SpurConfig,
    /// Drop trunk edges that lead to no service connection
    pub prune: bool,
    pub network: NetworkConfig,
    pub sizing: SizingConfig,
    pub heat_loss: HeatLossConfig,
    pub repair: RepairConfig,
    pub kpi: KpiConfig,
    pub water: WaterProps,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            crs: "EPSG:25833".to_string(),
            trunk: TrunkConfig::default(),
            spur: SpurConfig::default(),
            prune: true,
            network: NetworkConfig::default(),
            sizing: SizingConfig::default(),
            heat_loss: HeatLossConfig::default(),
            repair: RepairConfig::default(),
            kpi: KpiConfig::default(),
            water: WaterProps::default(),
        }
    }
}

impl PlanningConfig {
    pub fn snap_tolerance_m(&self) -> f64 {
        self.trunk.snap_tolerance_m
    }
}
