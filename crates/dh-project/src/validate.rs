//! Project validation logic.

use std::collections::HashSet;

use dh_core::Point;

use crate::schema::{ClusterDef, ProjectFile, SCHEMA_VERSION};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid catalog: {what}")]
    Catalog { what: String },

    #[error("Invalid configuration: {what}")]
    Config { what: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: String, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_point(field: String, p: Point) -> Result<(), ValidationError> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("({}, {})", p.x, p.y), "non-finite coordinate"))
    }
}

pub fn validate_project(project: &ProjectFile) -> Result<(), ValidationError> {
    if project.version == 0 || project.version > SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    for (i, street) in project.streets.iter().enumerate() {
        if street.points.len() < 2 {
            return Err(invalid(
                format!("streets[{i}].points"),
                street.points.len(),
                "a street needs at least two points",
            ));
        }
        for (k, p) in street.points.iter().enumerate() {
            check_point(format!("streets[{i}].points[{k}]"), *p)?;
        }
    }

    let mut cluster_ids = HashSet::new();
    let mut building_ids = HashSet::new();
    for cluster in &project.clusters {
        if !cluster_ids.insert(cluster.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: cluster.id.clone(),
                context: "clusters".to_string(),
            });
        }
        validate_cluster(cluster, &mut building_ids)?;
    }

    project.pipe_catalog()?;
    validate_config(project)?;
    Ok(())
}

/// Building ids are unique across the whole project.
fn validate_cluster<'a>(
    cluster: &'a ClusterDef,
    building_ids: &mut HashSet<&'a str>,
) -> Result<(), ValidationError> {
    check_point(format!("clusters.{}.plant", cluster.id), cluster.plant)?;
    for b in &cluster.buildings {
        if !building_ids.insert(b.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: b.id.clone(),
                context: format!("cluster '{}' buildings", cluster.id),
            });
        }
        check_point(format!("buildings.{}.centroid", b.id), b.centroid)?;
        if !b.design_load_kw.is_finite() || b.design_load_kw < 0.0 {
            return Err(invalid(
                format!("buildings.{}.design_load_kw", b.id),
                b.design_load_kw,
                "load must be finite and non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_config(project: &ProjectFile) -> Result<(), ValidationError> {
    let cfg = &project.config;
    if !(cfg.snap_tolerance_m().is_finite() && cfg.snap_tolerance_m() > 0.0) {
        return Err(invalid(
            "config.trunk.snap_tolerance_m".to_string(),
            cfg.snap_tolerance_m(),
            "must be positive",
        ));
    }
    if cfg.crs.trim().is_empty() {
        return Err(invalid("config.crs".to_string(), "''", "must not be empty"));
    }
    cfg.heat_loss.validate().map_err(config_error)?;
    cfg.kpi.validate().map_err(config_error)?;
    Ok(())
}

fn config_error(e: impl std::fmt::Display) -> ValidationError {
    ValidationError::Config {
        what: e.to_string(),
    }
}
