use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use crate::ai::QFunction;
use crate::checkpoint::{CheckpointHyperparameters, CheckpointManager, TrainingState};
use crate::error::TrainingError;
use crate::game::GameConfig;
use crate::training::collector::{Collector, CollectorConfig, WorkerStats};
use crate::training::metrics::MetricsSink;
use crate::training::policy_store::PolicyStore;
use crate::training::replay_buffer::{ReplayBuffer, SharedReplay};
use crate::training::trainer::{Trainer, TrainerConfig, TrainerReport};

type WorkerHandle = JoinHandle<Result<WorkerStats, TrainingError>>;

/// Cooperative stop flag shared by the trainer and every collector.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Everything a session needs besides the model.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub game: GameConfig,
    pub collector: CollectorConfig,
    pub trainer: TrainerConfig,
}

/// Outcome of a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub trainer: TrainerReport,
    pub workers: Vec<WorkerStats>,
    pub replay_len: usize,
}

/// Collector threads plus the trainer loop, wired to one replay buffer and
/// one policy store.
pub struct Session<M: QFunction + Clone> {
    config: SessionConfig,
    model: M,
    store: Arc<PolicyStore<M::Weights>>,
    replay: Arc<SharedReplay>,
    trainer: Trainer<M>,
    sink: Arc<dyn MetricsSink>,
    shutdown: ShutdownSignal,
}

impl<M: QFunction + Clone> Session<M> {
    pub fn new(config: SessionConfig, model: M, sink: Arc<dyn MetricsSink>) -> Self {
        Self::build(config, model, sink, TrainingState::default())
    }

    /// Continue from a restored checkpoint. `model` must already hold the
    /// restored weights.
    pub fn resumed(
        config: SessionConfig,
        model: M,
        sink: Arc<dyn MetricsSink>,
        state: TrainingState,
    ) -> Self {
        Self::build(config, model, sink, state)
    }

    fn build(
        config: SessionConfig,
        model: M,
        sink: Arc<dyn MetricsSink>,
        state: TrainingState,
    ) -> Self {
        let store = Arc::new(PolicyStore::with_version(
            model.weights(),
            state.policy_version,
        ));
        let buffer = match config.collector.seed {
            Some(seed) => ReplayBuffer::seeded(config.trainer.replay_capacity, seed),
            None => ReplayBuffer::new(config.trainer.replay_capacity),
        };
        let replay = Arc::new(SharedReplay::new(buffer));
        let trainer = Trainer::new(
            config.trainer.clone(),
            model.clone(),
            Arc::clone(&store),
            Arc::clone(&replay),
            Arc::clone(&sink),
        )
        .resume_from(state.iteration);
        Session {
            config,
            model,
            store,
            replay,
            trainer,
            sink,
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn with_checkpoints(
        mut self,
        manager: CheckpointManager,
        hyperparameters: CheckpointHyperparameters,
    ) -> Self {
        self.trainer = self.trainer.with_checkpoints(manager, hyperparameters);
        self
    }

    /// Handle for stopping the session from another thread.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    fn spawn_workers(&self) -> Result<Vec<WorkerHandle>, TrainingError> {
        let mut handles = Vec::with_capacity(self.config.collector.num_workers);
        for id in 0..self.config.collector.num_workers {
            let collector = Collector::new(
                id,
                self.config.game.clone(),
                self.model.clone(),
                Arc::clone(&self.store),
                Arc::clone(&self.replay),
                self.config.collector.clone(),
                Arc::clone(&self.sink),
            );
            let signal = self.shutdown.clone();
            let spawned = thread::Builder::new()
                .name(format!("collector-{id}"))
                .spawn(move || collector.run(signal));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.shutdown.request();
                    Self::join_workers(handles);
                    return Err(TrainingError::WorkerFailed {
                        worker: id,
                        reason: format!("failed to spawn: {e}"),
                    });
                }
            }
        }
        Ok(handles)
    }

    /// Join every worker. Returns the stats of clean exits and the first failure.
    fn join_workers(handles: Vec<WorkerHandle>) -> (Vec<WorkerStats>, Option<TrainingError>) {
        let mut stats = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(s)) => stats.push(s),
                Ok(Err(e)) => {
                    error!(worker = id, error = %e, "collector exited with error");
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    error!(worker = id, "collector panicked");
                    first_error.get_or_insert(TrainingError::WorkerFailed {
                        worker: id,
                        reason: "thread panicked".into(),
                    });
                }
            }
        }
        (stats, first_error)
    }

    /// Run collectors on their own threads and the trainer on this one.
    ///
    /// When the trainer returns, shutdown is requested and every worker is
    /// joined before the result is reported. A trainer error wins over a
    /// worker error.
    pub fn run(mut self) -> Result<SessionReport, TrainingError> {
        info!(
            workers = self.config.collector.num_workers,
            players = self.config.game.player_count,
            replay_capacity = self.config.trainer.replay_capacity,
            "starting training session"
        );
        let handles = self.spawn_workers()?;

        let trainer_result = self.trainer.run(&self.shutdown);
        self.shutdown.request();
        self.replay.notify_all();

        let (workers, worker_error) = Self::join_workers(handles);
        let trainer = trainer_result?;
        if let Some(e) = worker_error {
            return Err(e);
        }

        let replay_len = self.replay.len();
        info!(
            iterations = trainer.iterations,
            episodes = workers.iter().map(|w| w.episodes).sum::<u64>(),
            replay_len,
            "training session finished"
        );
        Ok(SessionReport {
            trainer,
            workers,
            replay_len,
        })
    }
}
