//! Plan export storage.
//!
//! Layout: `<root>/<cluster_id>/{manifest,network,sizing,report}.json`.

use std::fs;
use std::path::{Path, PathBuf};

use dh_kpi::KpiReport;
use dh_network::AssembledNetwork;
use dh_sizing::SizingReport;
use dh_solver::SimulationOutcome;
use dh_thermal::ThermalSummary;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::pipeline::{ClusterPlan, PlanStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanManifest {
    pub cluster_id: String,
    pub project_name: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    /// SHA-256 of configuration, catalog and tool version
    pub config_hash: String,
    pub crs: String,
    pub tool_version: String,
    pub stats: PlanStats,
    pub thermal: ThermalSummary,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationOutcome>,
}

impl PlanManifest {
    pub fn new(plan: &ClusterPlan, project_name: &str, config_hash: &str, crs: &str) -> Self {
        Self {
            cluster_id: plan.cluster_id.clone(),
            project_name: project_name.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            config_hash: config_hash.to_string(),
            crs: crs.to_string(),
            tool_version: crate::TOOL_VERSION.to_string(),
            stats: plan.stats.clone(),
            thermal: plan.thermal,
            warnings: plan.planning_warnings(),
            simulation: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanStore {
    root_dir: PathBuf,
}

impl PlanStore {
    pub fn new(root_dir: PathBuf) -> AppResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn cluster_dir(&self, cluster_id: &str) -> PathBuf {
        self.root_dir.join(cluster_id)
    }

    pub fn has_plan(&self, cluster_id: &str) -> bool {
        self.cluster_dir(cluster_id).join("manifest.json").exists()
    }

    /// Write manifest, network and sizing rationale for one cluster.
    pub fn save_plan(&self, manifest: &PlanManifest, plan: &ClusterPlan) -> AppResult<PathBuf> {
        let dir = self.cluster_dir(&manifest.cluster_id);
        fs::create_dir_all(&dir)?;
        write_json(&dir.join("manifest.json"), manifest)?;
        write_json(&dir.join("network.json"), &plan.network)?;
        write_json(&dir.join("sizing.json"), &plan.sizing)?;
        info!(cluster = %manifest.cluster_id, dir = %dir.display(), "plan saved");
        Ok(dir)
    }

    pub fn save_report(&self, cluster_id: &str, report: &KpiReport) -> AppResult<()> {
        let dir = self.cluster_dir(cluster_id);
        fs::create_dir_all(&dir)?;
        write_json(&dir.join("report.json"), report)
    }

    /// Replace the stored manifest, e.g. after a simulation.
    pub fn update_manifest(&self, manifest: &PlanManifest) -> AppResult<()> {
        if !self.has_plan(&manifest.cluster_id) {
            return Err(AppError::Results(format!(
                "no stored plan for cluster {}",
                manifest.cluster_id
            )));
        }
        write_json(
            &self.cluster_dir(&manifest.cluster_id).join("manifest.json"),
            manifest,
        )
    }

    pub fn load_manifest(&self, cluster_id: &str) -> AppResult<PlanManifest> {
        self.load(cluster_id, "manifest.json")
    }

    pub fn load_network(&self, cluster_id: &str) -> AppResult<AssembledNetwork> {
        self.load(cluster_id, "network.json")
    }

    pub fn load_sizing(&self, cluster_id: &str) -> AppResult<SizingReport> {
        self.load(cluster_id, "sizing.json")
    }

    pub fn load_report(&self, cluster_id: &str) -> AppResult<KpiReport> {
        self.load(cluster_id, "report.json")
    }

    /// Manifests of all stored plans, sorted by cluster id.
    pub fn list_plans(&self) -> AppResult<Vec<PlanManifest>> {
        let mut plans = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            if let Ok(manifest) = self.load_manifest(&id) {
                plans.push(manifest);
            }
        }
        plans.sort_by(|a, b| a.cluster_id.cmp(&b.cluster_id));
        Ok(plans)
    }

    fn load<T: serde::de::DeserializeOwned>(&self, cluster_id: &str, file: &str) -> AppResult<T> {
        let path = self.cluster_dir(cluster_id).join(file);
        if !path.exists() {
            return Err(AppError::Results(format!(
                "{file} not found for cluster {cluster_id}"
            )));
        }
        read_json(&path)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> AppResult<T> {
    let content = fs::read_to_string(path).map_err(|source| AppError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Read a network exported by [`PlanStore::save_plan`], typically after an
/// external solver has filled in its results.
pub fn read_network(path: &Path) -> AppResult<AssembledNetwork> {
    read_json(path)
}
