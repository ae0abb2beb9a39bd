//! OPSI CLI - build and review the local inventory cache
//!
//! Runs the same cache builder, tenancy review and discovery as the MCP
//! server, without an MCP client.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use opsi_mcp::cache::{BuildRequest, BuildStatus, OciInventorySource};
use opsi_mcp::config::AppConfig;
use opsi_mcp::discovery::{discover_databases, review_tenancy};
use opsi_mcp::logging::init_logging;
use opsi_mcp::registry::ClientRegistry;

/// OPSI CLI - inventory cache tools for OCI Operations Insights
#[derive(Parser)]
#[command(name = "opsi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and inspect the OPSI inventory cache", long_about = None)]
struct Cli {
    /// OCI config profile
    #[arg(short, long, global = true, env = "OCI_CLI_PROFILE")]
    profile: Option<String>,

    /// Log at debug level on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the inventory cache from OCI
    BuildCache {
        /// Root compartment OCID (repeatable, defaults to the tenancy)
        #[arg(short, long = "compartment")]
        compartments: Vec<String>,

        /// Region name or key (repeatable, "all" for every subscribed region)
        #[arg(short, long = "region")]
        regions: Vec<String>,

        /// Scan every READY subscribed region
        #[arg(long)]
        all_regions: bool,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cache age, status and counts
    CacheStatus {
        #[arg(long)]
        json: bool,
    },

    /// Review the cached tenancy inventory
    TenancyReview {
        #[arg(long)]
        json: bool,
    },

    /// Correlate Operations Insights and Database Management entries
    Discover {
        /// Compartment OCID (defaults to the tenancy)
        #[arg(short, long)]
        compartment: Option<String>,

        /// Region name or key
        #[arg(short, long)]
        region: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status_label(status: Option<BuildStatus>) -> colored::ColoredString {
    match status {
        Some(BuildStatus::Success) => "success".green(),
        Some(BuildStatus::Partial) => "partial".yellow(),
        Some(BuildStatus::Failed) => "failed".red(),
        None => "never built".yellow(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(if cli.verbose { "debug" } else { "warn" }, None)?;

    let registry = Arc::new(ClientRegistry::connect(config.clone()).await);
    let profile = registry.resolve_profile(cli.profile.as_deref());
    debug!(profile = %profile, "Using profile");

    match cli.command {
        Commands::BuildCache {
            compartments,
            regions,
            all_regions,
            json,
        } => {
            let mut request = BuildRequest {
                compartments,
                regions,
                all_regions,
            };
            if request.regions.iter().any(|r| r.eq_ignore_ascii_case("all")) {
                request.all_regions = true;
                request.regions.retain(|r| !r.eq_ignore_ascii_case("all"));
            }

            let client = registry.client(Some(&profile), None)?;
            let source = OciInventorySource::new(client);
            let cache = registry.cache(Some(&profile)).await;

            if !json {
                println!("{} {}", "Building inventory cache for".bright_cyan(), profile.bold());
            }
            let report = cache.rebuild(&source, &request, config.cache.max_concurrency).await;

            if json {
                print_json(&report)?;
            } else {
                println!("{}", "=".repeat(60).bright_blue());
                println!("{} {}", "Status:".bright_cyan(), status_label(Some(report.status)));
                println!("{} {}", "Regions:".bright_cyan(), report.regions.join(", "));
                println!("{} {}", "Compartments:".bright_cyan(), report.compartments);
                println!("{} {}", "Databases:".bright_cyan(), report.databases);
                println!("{} {}", "Hosts:".bright_cyan(), report.hosts);
                println!("{} {:.1}s", "Duration:".bright_cyan(), report.duration_seconds);
                println!("{} {}", "Saved to:".bright_cyan(), cache.path().display());

                for warning in &report.warnings {
                    println!("{} {}", "warning:".yellow(), warning);
                }
                for error in &report.errors {
                    println!("{} [{}] {}: {}", "error:".red(), error.step, error.scope, error.message);
                }
                println!("{}", "=".repeat(60).bright_blue());
            }

            if report.status == BuildStatus::Failed {
                anyhow::bail!("Inventory build failed");
            }
        }

        Commands::CacheStatus { json } => {
            let cache = registry.cache(Some(&profile)).await;
            let doc = cache.snapshot().await;
            let summary = doc.summary();
            let now = Utc::now();
            let fresh = doc.is_fresh_at(config.cache.max_age_hours, now);

            if json {
                print_json(&serde_json::json!({
                    "summary": summary,
                    "path": cache.path().display().to_string(),
                    "valid": fresh,
                    "age_hours": doc.age(now).map(|a| a.num_seconds() as f64 / 3600.0),
                }))?;
            } else {
                println!("{}", "OPSI Inventory Cache".bright_cyan().bold());
                println!("{}", "=".repeat(40).bright_blue());
                println!("{} {}", "Profile:".cyan(), summary.profile);
                println!("{} {}", "File:".cyan(), cache.path().display());
                println!("{} {}", "Build:".cyan(), status_label(doc.metadata.build_status));
                println!(
                    "{} {} ({})",
                    "Updated:".cyan(),
                    summary.last_updated.as_deref().unwrap_or("-"),
                    if fresh { "fresh".green() } else { "stale".yellow() }
                );
                println!("{} {}", "Regions:".cyan(), summary.regions_scanned.join(", "));
                println!("{} {}", "Compartments:".cyan(), summary.compartments);
                println!("{} {}", "Databases:".cyan(), summary.databases);
                println!("{} {}", "Hosts:".cyan(), summary.hosts);
            }
        }

        Commands::TenancyReview { json } => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let report = review_tenancy(&doc, Utc::now());

            if json {
                print_json(&report)?;
            } else {
                println!(
                    "{} {}",
                    "Tenancy review:".bright_cyan().bold(),
                    report.tenancy.as_deref().unwrap_or(&report.profile)
                );
                println!("{}", "=".repeat(60).bright_blue());
                println!(
                    "{} {} compartments (depth {}), {} databases, {} hosts",
                    "Totals:".cyan(),
                    report.total_compartments,
                    report.max_depth,
                    report.total_databases,
                    report.total_hosts
                );
                if let Some(age) = report.cache_age_hours {
                    println!("{} {:.1}h", "Cache age:".cyan(), age);
                }

                if !report.databases_by_entity_source.is_empty() {
                    println!("\n{}", "Databases by source:".bright_green().bold());
                    for (source, count) in &report.databases_by_entity_source {
                        println!("  {:<40} {}", source, count);
                    }
                }

                if !report.databases_not_enabled.is_empty() {
                    println!("\n{}", "Insights not enabled:".bright_red().bold());
                    for db in &report.databases_not_enabled {
                        println!("  {} ({}) {}", db.name, db.compartment, db.status.yellow());
                    }
                }

                if !report.empty_compartments.is_empty() {
                    println!("\n{}", "Empty compartments:".bright_yellow().bold());
                    for c in &report.empty_compartments {
                        println!("  {}{}", "  ".repeat(c.level as usize), c.name);
                    }
                }

                if !report.recommendations.is_empty() {
                    println!("\n{}", "Recommendations:".bright_cyan().bold());
                    for r in &report.recommendations {
                        println!("  - {}", r);
                    }
                }
            }
        }

        Commands::Discover {
            compartment,
            region,
            json,
        } => {
            let report = discover_databases(&registry, Some(&profile), compartment.as_deref(), region.as_deref()).await?;

            if json {
                print_json(&report)?;
            } else {
                println!(
                    "{} {} in {}",
                    "Databases under".bright_cyan().bold(),
                    report.compartment_id,
                    report.region
                );
                println!("{}", "=".repeat(60).bright_blue());
                for db in &report.databases {
                    let insight = if db.has_insight() { "OPSI".green() } else { "----".dimmed() };
                    let managed = match &db.management_option {
                        Some(option) => option.green(),
                        None if db.is_managed() => "DBM".green(),
                        None => "---".dimmed(),
                    };
                    println!(
                        "  {} {:<8} {}",
                        insight,
                        managed,
                        db.name.as_deref().unwrap_or(&db.database_id)
                    );
                }
                println!(
                    "\n{} {} both, {} insights only, {} managed only",
                    "Summary:".cyan(),
                    report.both,
                    report.insight_only,
                    report.managed_only
                );
                for e in &report.errors {
                    println!("{} {}", "warning:".yellow(), e);
                }
            }
        }
    }

    Ok(())
}
