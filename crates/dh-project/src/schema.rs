//! Project file schema.

use dh_core::{Building, Point, StreetLine};
use dh_sizing::{CatalogEntry, PipeCatalog};
use serde::{Deserialize, Serialize};

use crate::config::PlanningConfig;
use crate::validate::ValidationError;

/// Current project file format version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    pub name: String,
    /// Street centerlines shared by all clusters
    #[serde(default)]
    pub streets: Vec<StreetLine>,
    #[serde(default)]
    pub clusters: Vec<ClusterDef>,
    /// Pipe sizes; the built-in EN 253 steel series when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Vec<CatalogEntry>>,
    #[serde(default)]
    pub config: PlanningConfig,
}

/// One group of buildings planned as a single network around a plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDef {
    pub id: String,
    pub plant: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_hour: Option<String>,
    pub buildings: Vec<Building>,
}

impl ProjectFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            name: name.into(),
            streets: Vec::new(),
            clusters: Vec::new(),
            catalog: None,
            config: PlanningConfig::default(),
        }
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterDef> {
        self.clusters.iter().find(|c| c.id == id)
    }

    pub fn pipe_catalog(&self) -> Result<PipeCatalog, ValidationError> {
        match &self.catalog {
            None => Ok(PipeCatalog::en253_steel()),
            Some(entries) => PipeCatalog::new(entries.clone())
                .map_err(|e| ValidationError::Catalog { what: e.to_string() }),
        }
    }
}

impl ClusterDef {
    pub fn total_load_kw(&self) -> f64 {
        self.buildings.iter().map(|b| b.design_load_kw).sum()
    }
}
