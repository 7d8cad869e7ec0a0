use clap::{Parser, Subcommand};
use dh_app::{
    config_hash, evaluate_network, plan_batch, read_network, AppError, AppResult, PlanManifest,
    PlanStore,
};
use dh_kpi::KpiContext;
use dh_project::{load_project, validate_project, PlanningConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "dh-cli")]
#[command(about = "District-heating network planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project file (.yaml, .yml or .json)
        project_path: PathBuf,
    },
    /// Plan cluster networks and export them for the solver
    Plan {
        /// Path to the project file
        project_path: PathBuf,
        /// Plan only this cluster
        #[arg(long)]
        cluster: Option<String>,
        /// Output directory for plan exports
        #[arg(long, default_value = "plans")]
        out: PathBuf,
    },
    /// Extract KPIs from a solved network export
    Kpi {
        /// Path to a network.json carrying solver results
        network_path: PathBuf,
        /// Cluster identifier recorded in the report
        #[arg(long)]
        cluster_id: String,
        /// Project file whose configuration to use (defaults otherwise)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include per-pipe, per-junction and per-consumer tables
        #[arg(long)]
        detailed: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Plan {
            project_path,
            cluster,
            out,
        } => cmd_plan(&project_path, cluster.as_deref(), out),
        Commands::Kpi {
            network_path,
            cluster_id,
            config,
            output,
            detailed,
        } => cmd_kpi(
            &network_path,
            &cluster_id,
            config.as_deref(),
            output.as_deref(),
            detailed,
        ),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = load_project(project_path)?;
    validate_project(&project)?;
    let buildings: usize = project.clusters.iter().map(|c| c.buildings.len()).sum();
    println!("✓ Project is valid");
    println!(
        "  {} street line(s), {} cluster(s), {} building(s), CRS {}",
        project.streets.len(),
        project.clusters.len(),
        buildings,
        project.config.crs
    );
    Ok(())
}

fn cmd_plan(project_path: &Path, cluster: Option<&str>, out: PathBuf) -> AppResult<()> {
    let project = load_project(project_path)?;
    let catalog = project.pipe_catalog()?;
    let hash = config_hash(&project.config, &catalog);
    let store = PlanStore::new(out)?;

    let items = plan_batch(&project, cluster)?;
    let total = items.len();
    let mut failed = 0;
    for item in items {
        match item.result {
            Ok(plan) => {
                let manifest =
                    PlanManifest::new(&plan, &project.name, &hash, &project.config.crs);
                let dir = store.save_plan(&manifest, &plan)?;
                println!(
                    "✓ {}: {} building(s) connected, {} skipped, {} pipes, cost {} -> {}",
                    plan.cluster_id,
                    plan.stats.buildings_connected,
                    plan.stats.buildings_skipped,
                    plan.network.pipes().len(),
                    plan.sizing
                        .total_cost
                        .map_or_else(|| "n/a".to_string(), |c| format!("{c:.0}")),
                    dir.display()
                );
                for w in &manifest.warnings {
                    println!("    warning: {w}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("✗ {}: {} ({:?})", item.cluster_id, e, e.kind());
            }
        }
    }

    if failed > 0 {
        return Err(AppError::Results(format!(
            "{failed} of {total} cluster(s) failed to plan"
        )));
    }
    Ok(())
}

fn cmd_kpi(
    network_path: &Path,
    cluster_id: &str,
    config_path: Option<&Path>,
    output: Option<&Path>,
    detailed: bool,
) -> AppResult<()> {
    let mut config = match config_path {
        Some(path) => load_project(path)?.config,
        None => PlanningConfig::default(),
    };
    config.kpi.detailed |= detailed;

    let network = read_network(network_path)?;
    let report = evaluate_network(&network, &KpiContext::new(cluster_id), &config)?;
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!(path = %path.display(), "report written");
            println!(
                "✓ {}: feasible = {}, report -> {}",
                cluster_id,
                report.en13941_compliance.feasible,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
