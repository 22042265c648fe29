//! GPU Spend Intelligence dashboard
//!
//! A terminal dashboard for ML training spend: live running costs with
//! budget alerts, experiment listings, leaderboards, pricing and trends.

mod api;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{epochs, experiments, history, leaderboard, live, pricing};
use spend_lib::generator::{ExperimentCatalog, ExperimentGenerator};
use spend_lib::models::{ExperimentStatus, Provider};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// GPU Spend Intelligence dashboard
#[derive(Parser)]
#[command(name = "gpu-spend")]
#[command(author, version, about = "GPU Spend Intelligence dashboard for ML training costs", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Seed for reproducible data (overrides configuration)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream simulated costs of running experiments with budget alerts
    Live {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        duration: Option<u64>,

        /// Monthly budget in USD (overrides configuration)
        #[arg(long)]
        budget: Option<f64>,
    },

    /// List experiments
    Experiments {
        /// Filter by status (queued, running, completed, failed)
        #[arg(long)]
        status: Option<ExperimentStatus>,

        /// Filter by team
        #[arg(long)]
        team: Option<String>,

        /// Filter by researcher
        #[arg(long)]
        researcher: Option<String>,

        /// Maximum number of rows
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Most expensive runs, best ROI and spend by team and researcher
    Leaderboard {
        /// Entries per board
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// GPU pricing across cloud providers
    Pricing {
        /// Filter by provider (aws, gcp, azure)
        #[arg(long)]
        provider: Option<Provider>,
    },

    /// Daily spend history with a short projection
    History {
        /// Days of history
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Days to project forward
        #[arg(long, default_value_t = 7)]
        project: u32,
    },

    /// Per-epoch metrics of one experiment
    Epochs {
        /// Experiment ID (e.g. exp-01001)
        id: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn generator(seed: Option<u64>) -> ExperimentGenerator {
    match seed {
        Some(seed) => ExperimentGenerator::with_seed(seed),
        None => ExperimentGenerator::from_os_rng(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = config::DashboardConfig::load(cli.config.as_deref())?;
    let seed = cli.seed.or(config.seed);
    debug!(seed = ?seed, budget = config.monthly_budget, "Dashboard configured");

    let mut generator = generator(seed);
    let catalog = ExperimentCatalog::generate(&mut generator);

    match cli.command {
        Commands::Live { duration, budget } => {
            let options = live::LiveOptions {
                duration_secs: duration,
                budget,
            };
            live::run_live(&catalog, &config, options, cli.format).await?;
        }
        Commands::Experiments {
            status,
            team,
            researcher,
            limit,
        } => {
            let filter = experiments::ExperimentFilter {
                status,
                team,
                researcher,
                limit,
            };
            experiments::list_experiments(&catalog, &filter, cli.format)?;
        }
        Commands::Leaderboard { top } => {
            leaderboard::show_leaderboard(&catalog, top, cli.format)?;
        }
        Commands::Pricing { provider } => {
            pricing::show_pricing(provider, cli.format)?;
        }
        Commands::History { days, project } => {
            history::show_history(days, project, seed, cli.format)?;
        }
        Commands::Epochs { id } => {
            epochs::show_epochs(&catalog, &mut generator, &id, cli.format)?;
        }
    }

    Ok(())
}
