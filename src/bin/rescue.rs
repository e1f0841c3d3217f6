use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use u_rescue::world::WorldModel;
use u_rescue::{RescueConfig, RescueMission};

#[derive(Parser, Debug)]
#[command(name = "u-rescue", version, about = "Plan multi-robot rescue missions")]
struct Cli {
    /// Configuration file (`KEY = VALUE` text or `.json`).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed for world generation and evolution.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of generations.
    #[arg(long)]
    generations: Option<usize>,

    /// Score fitness on the calling thread instead of a worker pool.
    #[arg(long)]
    sequential: bool,

    /// Skip the baseline comparison.
    #[arg(long)]
    no_baseline: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RescueConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RescueConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(generations) = cli.generations {
        config.generations = generations;
    }
    if cli.sequential {
        config.parallel = false;
    }
    if cli.no_baseline {
        config.baseline = false;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        warn!("interrupt received; stopping after the current generation");
        flag.store(true, Ordering::Relaxed);
    })
    .context("installing interrupt handler")?;

    let mission = RescueMission::new(config);
    let world: Arc<dyn WorldModel> = Arc::new(mission.generate_world()?);
    let outcome = mission.run(world, Some(&cancel))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print!("{}", outcome.report);
    }
    if let Some(stats) = outcome.pool_stats {
        info!(
            generations = stats.generations,
            evaluations = stats.evaluations,
            faults = stats.faults,
            "worker pool summary"
        );
    }
    if outcome.cancelled() {
        info!("run was interrupted; report shows the best plan so far");
    }
    Ok(())
}
