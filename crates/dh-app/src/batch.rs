//! Parallel planning of several clusters.

use dh_project::{validate_project, ProjectFile};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::pipeline::{plan_cluster, ClusterPlan, PlanInput};

/// Outcome of one cluster in a batch. Failures do not stop other clusters.
#[derive(Debug)]
pub struct BatchItem {
    pub cluster_id: String,
    pub result: AppResult<ClusterPlan>,
}

/// Plan every cluster of a project (or just `only`) in parallel.
///
/// Results are returned in project order.
pub fn plan_batch(project: &ProjectFile, only: Option<&str>) -> AppResult<Vec<BatchItem>> {
    validate_project(project)?;
    let catalog = project.pipe_catalog()?;

    let clusters: Vec<_> = match only {
        Some(id) => vec![project
            .cluster(id)
            .ok_or_else(|| AppError::ClusterNotFound(id.to_string()))?],
        None => project.clusters.iter().collect(),
    };
    info!(clusters = clusters.len(), project = %project.name, "batch planning");

    let items: Vec<BatchItem> = clusters
        .par_iter()
        .map(|&cluster| {
            let input = PlanInput {
                streets: &project.streets,
                cluster,
                catalog: &catalog,
                config: &project.config,
            };
            BatchItem {
                cluster_id: cluster.id.clone(),
                result: plan_cluster(&input),
            }
        })
        .collect();

    for item in &items {
        if let Err(e) = &item.result {
            warn!(cluster = %item.cluster_id, kind = ?e.kind(), error = %e, "cluster failed");
        }
    }
    Ok(items)
}
