use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use letx_sim::config::SimConfig;
use letx_sim::network::Simulation;
use tracing::info;

/// Seeded mobility simulation of the letx link-quality engine.
#[derive(Parser, Debug)]
#[command(name = "letx-sim", about = "ETX + LET link-quality simulation")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured number of probe periods.
    #[arg(long)]
    steps: Option<u64>,

    /// Print the full report as JSON on stdout.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SimConfig::from_toml_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if let Some(steps) = cli.steps {
        cfg.steps = steps;
    }

    let mut sim = Simulation::new(cfg);
    let report = sim.run();

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{json}");
        return Ok(());
    }

    for node in &report.nodes {
        info!(
            node = %node.address,
            neighbors = node.summary.neighbors,
            usable = node.summary.usable,
            expiring = node.expiring_links(),
            best_metric = ?node.summary.best_metric,
            valid_routes = node.valid_routes,
            "final state"
        );
    }
    Ok(())
}
