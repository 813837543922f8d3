#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for inspecting and rescoring the safety map.
//!
//! ```text
//! safety_map_cli regions
//! safety_map_cli region <id>
//! safety_map_cli incidents [--status verified] [--type gbv] [--alert high_alert] [--limit 100]
//! safety_map_cli recompute-region <id>
//! safety_map_cli recompute-all
//! safety_map_cli match '<geojson>'
//! safety_map_cli overlap '<geojson>' '<geojson>'
//! safety_map_cli config
//! ```
//!
//! The database is taken from `SAFETY_MAP_DB` and the tuning from the TOML
//! file named by `SAFETY_MAP_SCORING_CONFIG` (embedded defaults otherwise).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use safety_map_engine::{Engine, EngineConfig};
use safety_map_geography_models::AreaShape;
use safety_map_incident_models::{AlertLevel, IncidentFilter, IncidentStatus, Severity};
use safety_map_spatial::{RegionAssignment, overlap};

#[derive(Parser)]
#[command(
    name = "safety_map_cli",
    about = "Inspect and rescore safety map incidents and regions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List regions with their scores
    Regions,
    /// Show a region and its incidents as JSON
    Region {
        /// Region ID
        id: String,
    },
    /// List incidents
    Incidents {
        /// Only incidents with this status
        #[arg(long)]
        status: Option<IncidentStatus>,
        /// Only incidents of this category
        #[arg(long = "type")]
        incident_type: Option<String>,
        /// Only incidents at this alert level
        #[arg(long)]
        alert: Option<AlertLevel>,
        /// Maximum number of incidents to show
        #[arg(long, default_value = "100")]
        limit: usize,
    },
    /// Rebuild one region's statistics
    RecomputeRegion {
        /// Region ID
        id: String,
    },
    /// Refresh every incident and region score
    RecomputeAll,
    /// Show which region a shape would join
    Match {
        /// `GeoJSON`-like shape
        shape: String,
    },
    /// Overlap percentage between two shapes
    Overlap {
        /// First shape
        a: String,
        /// Second shape
        b: String,
    },
    /// Print the effective configuration
    Config,
}

fn parse_shape(input: &str) -> Result<AreaShape, Box<dyn std::error::Error>> {
    let value: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| format!("Shape is not valid JSON ({e}): {input}"))?;
    Ok(AreaShape(value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = EngineConfig::from_env()?;
    log::debug!("Engine config: {config:?}");

    // Commands that never touch the database.
    match &cli.command {
        Commands::Overlap { a, b } => {
            let percent = overlap(&parse_shape(a)?, &parse_shape(b)?, &config.geometry);
            println!("{percent:.2}");
            return Ok(());
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        _ => {}
    }

    let store = safety_map_database::open_from_env().await?;
    let engine = Engine::new(Arc::new(store), config)?;

    match cli.command {
        Commands::Regions => {
            let regions = engine.list_regions().await?;

            if regions.is_empty() {
                println!("No regions found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<24} {:>9} {:>10} {:>10} {:>8}",
                "ID", "NAME", "INCIDENTS", "RAW", "NORMALIZED", "SEVERITY"
            );
            println!("{}", "-".repeat(104));

            for region in &regions {
                let severity = region
                    .stats
                    .average_severity
                    .as_ref()
                    .map_or("-", Severity::as_str);
                println!(
                    "{:<38} {:<24} {:>9} {:>10.4} {:>10.2} {:>8}",
                    region.id,
                    truncate(&region.name, 24),
                    region.stats.incident_count,
                    region.stats.raw_score,
                    region.stats.normalized_score,
                    severity,
                );
            }

            println!("\n{} region(s)", regions.len());
        }
        Commands::Region { id } => {
            let region = engine.get_region(&id).await?;
            let incidents = engine.region_incidents(&id).await?;
            let json = serde_json::json!({ "region": region, "incidents": incidents });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Incidents {
            status,
            incident_type,
            alert,
            limit,
        } => {
            let incidents = engine
                .list_incidents(&IncidentFilter {
                    status,
                    incident_type,
                    alert_level: alert,
                    limit,
                })
                .await?;

            if incidents.is_empty() {
                println!("No incidents found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<16} {:<9} {:<9} {:>8} {:>12}",
                "ID", "TYPE", "SEVERITY", "STATUS", "DECAY", "CONTRIBUTION"
            );
            println!("{}", "-".repeat(96));

            for incident in &incidents {
                println!(
                    "{:<38} {:<16} {:<9} {:<9} {:>8.4} {:>12.4}",
                    incident.id,
                    truncate(&incident.incident_type, 16),
                    incident.severity.as_str(),
                    incident.status.as_ref(),
                    incident.time_decay_factor,
                    incident.contribution_score,
                );
            }

            println!("\n{} incident(s)", incidents.len());
        }
        Commands::RecomputeRegion { id } => {
            let region = engine.recompute_region(&id).await?;
            println!(
                "Region {}: {} incident(s), raw {:.4}, normalized {:.2}",
                region.id,
                region.stats.incident_count,
                region.stats.raw_score,
                region.stats.normalized_score,
            );
        }
        Commands::RecomputeAll => {
            let (incidents, regions) = engine.recompute_all().await?;
            println!("Recomputed {incidents} incident(s) and {regions} region(s)");
        }
        Commands::Match { shape } => match engine.match_region(&parse_shape(&shape)?).await? {
            RegionAssignment::Existing(id) => println!("Joins region {id}"),
            RegionAssignment::CreateNew => println!("No match, a new region would be created"),
        },
        Commands::Overlap { .. } | Commands::Config => {}
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}
