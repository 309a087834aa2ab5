#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ml_uno::ai::{Agent, DqnConfig, DqnModel, GreedyAgent, SafeAgent};
use ml_uno::checkpoint::{CheckpointManager, CheckpointManagerConfig};
use ml_uno::config::AppConfig;
use ml_uno::logging::init_logging;
use ml_uno::training::{evaluate, EvaluationReport};

/// Play a trained agent against random legal-move bots.
#[derive(Parser)]
#[command(name = "evaluate", about = "Evaluate a trained Uno DQN agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Checkpoint directory (defaults to the configured one)
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Number of evaluation games
    #[arg(long, default_value_t = 200)]
    games: usize,

    /// Seed for table shuffles and opponents
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Restrict the agent's greedy pick to legal actions
    #[arg(long)]
    legal_only: bool,

    /// Also evaluate a random legal-move agent for comparison
    #[arg(long)]
    baseline: bool,
}

fn log_report(name: &str, report: &EvaluationReport) {
    info!(
        agent = name,
        games = report.games,
        wins = report.wins,
        win_rate = report.win_rate(),
        elimination_rate = report.elimination_rate(),
        unfinished = report.unfinished,
        average_length = report.average_length,
        "evaluation finished"
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let _log_guard = init_logging(&app_config.logging).context("initializing logging")?;

    let manager = CheckpointManager::open(CheckpointManagerConfig {
        checkpoint_dir: cli
            .checkpoint_dir
            .clone()
            .unwrap_or_else(|| app_config.checkpoint.checkpoint_dir.clone()),
        ..app_config.checkpoint.clone()
    })
    .context("opening checkpoint directory")?;
    let loaded = manager.load_latest().context("loading latest checkpoint")?;

    // The network shape must match what was saved, whatever the config says now.
    let hyper = &loaded.metadata.hyperparameters;
    let mut model = DqnModel::for_table(DqnConfig {
        learning_rate: hyper.learning_rate,
        hidden_size: hyper.hidden_size,
        hidden_layers: hyper.hidden_layers,
    });
    loaded
        .restore_into(&mut model)
        .with_context(|| format!("restoring weights from {}", loaded.path.display()))?;
    info!(
        path = %loaded.path.display(),
        iteration = loaded.training_state.iteration,
        "loaded checkpoint"
    );

    let mut agent = if cli.legal_only {
        GreedyAgent::legal_only(model)
    } else {
        GreedyAgent::new(model)
    };
    let report = evaluate(&mut agent, &app_config.game, cli.games, cli.seed)
        .context("evaluating agent")?;
    log_report(agent.name(), &report);

    if cli.baseline {
        let mut baseline = SafeAgent::seeded(cli.seed);
        let report = evaluate(&mut baseline, &app_config.game, cli.games, cli.seed)
            .context("evaluating baseline")?;
        log_report(baseline.name(), &report);
    }
    Ok(())
}
