//! Content hashing of planning inputs.

use dh_project::PlanningConfig;
use dh_sizing::PipeCatalog;
use sha2::{Digest, Sha256};

/// SHA-256 over the configuration and catalog as JSON.
pub fn config_hash(config: &PlanningConfig, catalog: &PipeCatalog) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    let catalog_json = serde_json::to_string(catalog).unwrap_or_default();
    hasher.update(catalog_json.as_bytes());

    hasher.update(crate::TOOL_VERSION.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
