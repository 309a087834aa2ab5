#![recursion_limit = "256"]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ml_uno::ai::DqnModel;
use ml_uno::checkpoint::{CheckpointManager, TrainingState};
use ml_uno::config::AppConfig;
use ml_uno::error::CheckpointError;
use ml_uno::logging::init_logging;
use ml_uno::training::{Session, TracingSink};

/// Train a DQN agent for Uno via multi-worker self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train an Uno DQN agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Override the number of trainer iterations
    #[arg(long)]
    iterations: Option<u64>,

    /// Override the number of collector workers
    #[arg(long)]
    workers: Option<usize>,

    /// Override the number of players at each table
    #[arg(long)]
    players: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Seed collectors and the replay buffer
    #[arg(long)]
    seed: Option<u64>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml().context("serializing default config")?);
        return Ok(());
    }

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(iterations) = cli.iterations {
        app_config.training.max_iterations = Some(iterations);
    }
    if let Some(workers) = cli.workers {
        app_config.collector.num_workers = workers;
    }
    if let Some(players) = cli.players {
        app_config.game.player_count = players;
    }
    if let Some(lr) = cli.lr {
        app_config.dqn.learning_rate = lr;
    }
    if cli.seed.is_some() {
        app_config.collector.seed = cli.seed;
    }
    app_config.validate().context("validating configuration")?;

    let _log_guard = init_logging(&app_config.logging).context("initializing logging")?;

    let mut model = DqnModel::for_table(app_config.dqn.clone());
    let state = if cli.resume {
        resume_model(&mut model, &app_config)?
    } else {
        TrainingState::default()
    };

    let mut session = Session::resumed(
        app_config.session(),
        model,
        Arc::new(TracingSink),
        state,
    );
    if app_config.checkpoint.enabled {
        let manager = CheckpointManager::new(app_config.checkpoint.clone())
            .context("preparing checkpoint directory")?;
        session = session.with_checkpoints(manager, app_config.checkpoint_hyperparameters());
    }

    let report = session.run().context("training session failed")?;

    let episodes: u64 = report.workers.iter().map(|w| w.episodes).sum();
    let eliminations: u64 = report.workers.iter().map(|w| w.eliminations).sum();
    info!(
        iterations = report.trainer.iterations,
        final_iteration = report.trainer.final_iteration,
        policy_version = report.trainer.policy_version,
        average_loss = report.trainer.average_loss,
        episodes,
        eliminations,
        replay_len = report.replay_len,
        "training complete"
    );
    Ok(())
}

/// Restore the latest checkpoint into `model`. A missing checkpoint starts
/// fresh; a corrupt one is an error.
fn resume_model(model: &mut DqnModel, config: &AppConfig) -> Result<TrainingState> {
    let loaded = match CheckpointManager::open(config.checkpoint.clone())
        .and_then(|manager| manager.load_latest())
    {
        Ok(loaded) => loaded,
        Err(e @ (CheckpointError::DirNotFound(_) | CheckpointError::NoLatest(_))) => {
            warn!(error = %e, "no checkpoint found, starting fresh");
            return Ok(TrainingState::default());
        }
        Err(e) => return Err(e).context("loading latest checkpoint"),
    };

    loaded
        .restore_into(model)
        .with_context(|| format!("restoring weights from {}", loaded.path.display()))?;
    info!(
        path = %loaded.path.display(),
        iteration = loaded.training_state.iteration,
        policy_version = loaded.training_state.policy_version,
        "resumed from checkpoint"
    );
    Ok(loaded.training_state)
}
