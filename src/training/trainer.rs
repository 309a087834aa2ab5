use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::ai::{FitMetrics, QBatch, QFunction, Transition};
use crate::checkpoint::{
    CheckpointHyperparameters, CheckpointManager, CheckpointMetadata, CheckpointMetrics,
    TrainingState,
};
use crate::error::TrainingError;
use crate::game::Observation;
use crate::training::metrics::{MetricsSink, TrainingMetrics};
use crate::training::policy_store::PolicyStore;
use crate::training::replay_buffer::SharedReplay;
use crate::training::session::ShutdownSignal;

/// Trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Discount factor.
    pub gamma: f32,
    /// Iterations between learner -> policy weight copies.
    pub sync_interval: usize,
    /// Iterations between checkpoints.
    pub checkpoint_interval: usize,
    /// Stop after this many iterations (counted from the resume point). Unbounded when absent.
    pub max_iterations: Option<u64>,
    /// Longest single wait for the buffer to fill before rechecking shutdown.
    pub poll_interval_ms: u64,
    pub max_consecutive_failures: usize,
    pub log_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            batch_size: 512,
            replay_capacity: 10_000,
            gamma: 0.7,
            sync_interval: 20,
            checkpoint_interval: 1000,
            max_iterations: None,
            poll_interval_ms: 50,
            max_consecutive_failures: 10,
            log_interval: 100,
        }
    }
}

/// Single-action Bellman targets.
///
/// Row `i` of `current` keeps its predicted values except at the taken
/// action, which becomes `reward` for terminal transitions and
/// `reward + gamma * next_max[i]` otherwise.
pub fn bellman_targets<T: AsRef<Transition>>(
    mut current: QBatch,
    transitions: &[T],
    next_max: &[f32],
    gamma: f32,
) -> QBatch {
    for (i, (t, &next)) in transitions.iter().zip(next_max).enumerate() {
        let t = t.as_ref();
        current.row_mut(i)[t.action] = if t.terminal {
            t.reward
        } else {
            t.reward + gamma * next
        };
    }
    current
}

/// Summary returned when the trainer loop ends.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerReport {
    pub iterations: u64,
    pub final_iteration: u64,
    pub policy_version: u64,
    pub average_loss: f32,
    pub failures: u64,
}

/// Q-learning trainer: samples the shared buffer, fits the learner, and
/// periodically publishes the learner's weights as the new policy.
pub struct Trainer<M: QFunction> {
    config: TrainerConfig,
    learner: M,
    policy: M,
    store: Arc<PolicyStore<M::Weights>>,
    replay: Arc<SharedReplay>,
    checkpoints: Option<CheckpointManager>,
    hyperparameters: Option<CheckpointHyperparameters>,
    sink: Arc<dyn MetricsSink>,
    metrics: TrainingMetrics,
    iteration: u64,
    failures: u64,
}

impl<M: QFunction + Clone> Trainer<M> {
    /// Build a trainer whose policy and learner start from the same weights.
    pub fn new(
        config: TrainerConfig,
        model: M,
        store: Arc<PolicyStore<M::Weights>>,
        replay: Arc<SharedReplay>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let window = config.log_interval.max(1);
        Trainer {
            config,
            policy: model.clone(),
            learner: model,
            store,
            replay,
            checkpoints: None,
            hyperparameters: None,
            sink,
            metrics: TrainingMetrics::with_capacity(window),
            iteration: 0,
            failures: 0,
        }
    }
}

impl<M: QFunction> Trainer<M> {
    /// Write checkpoints through `manager` every `checkpoint_interval` iterations.
    pub fn with_checkpoints(
        mut self,
        manager: CheckpointManager,
        hyperparameters: CheckpointHyperparameters,
    ) -> Self {
        self.checkpoints = Some(manager);
        self.hyperparameters = Some(hyperparameters);
        self
    }

    /// Continue the iteration counter from a restored checkpoint.
    pub fn resume_from(mut self, iteration: u64) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn policy(&self) -> &M {
        &self.policy
    }

    pub fn learner(&self) -> &M {
        &self.learner
    }

    /// Current policy weights, e.g. for an external checkpoint.
    pub fn policy_weights(&self) -> M::Weights {
        self.policy.weights()
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Copy learner weights into the policy and publish them to collectors.
    pub fn sync_policy(&mut self) -> u64 {
        let weights = self.learner.weights();
        self.policy.set_weights(weights.clone());
        let version = self.store.publish(weights);
        debug!(iteration = self.iteration, version, "policy synchronized");
        version
    }

    /// Fit the learner on one batch of transitions.
    ///
    /// Current and next-state values both come from the policy approximator.
    pub fn fit_batch<T: AsRef<Transition>>(
        &mut self,
        batch: &[T],
    ) -> Result<FitMetrics, TrainingError> {
        let states: Vec<Observation> = batch.iter().map(|t| t.as_ref().state.clone()).collect();
        let next_states: Vec<Observation> =
            batch.iter().map(|t| t.as_ref().next_state.clone()).collect();
        let action_count = self.policy.action_count();

        let current = self.policy.predict(&states)?;
        current.expect_shape(batch.len(), action_count)?;
        let next = self.policy.predict(&next_states)?;
        next.expect_shape(batch.len(), action_count)?;

        let targets = bellman_targets(current, batch, &next.max_per_row(), self.config.gamma);
        Ok(self.learner.fit(&states, &targets)?)
    }

    /// Run one iteration. Returns `Ok(None)` when the buffer did not reach
    /// `batch_size` within one poll interval.
    pub fn train_step(&mut self) -> Result<Option<FitMetrics>, TrainingError> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        if !self.replay.wait_for_len(self.config.batch_size, poll) {
            return Ok(None);
        }

        let batch = self.replay.sample(self.config.batch_size);
        let fit = self.fit_batch(&batch)?;

        self.iteration += 1;
        self.metrics.record_update(fit.loss, fit.accuracy);
        self.sink.scalar("loss", fit.loss as f64, self.iteration);
        if let Some(acc) = fit.accuracy {
            self.sink.scalar("accuracy", acc as f64, self.iteration);
        }

        if self.iteration % self.config.sync_interval as u64 == 0 {
            self.sync_policy();
        }
        if self.iteration % self.config.checkpoint_interval as u64 == 0 {
            self.save_checkpoint();
        }

        Ok(Some(fit))
    }

    /// Checkpoint failures are logged and training continues.
    fn save_checkpoint(&self) {
        let (Some(manager), Some(hyperparameters)) = (&self.checkpoints, &self.hyperparameters)
        else {
            return;
        };
        let window = self.config.log_interval;
        let metadata = CheckpointMetadata::now(
            TrainingState {
                iteration: self.iteration,
                policy_version: self.store.version(),
            },
            CheckpointMetrics {
                loss: self.metrics.average_loss(window),
                accuracy: self.metrics.average_accuracy(window),
                replay_len: self.replay.len(),
            },
            hyperparameters.clone(),
        );
        match manager.save_checkpoint(&self.policy, &metadata) {
            Ok(path) => info!(iteration = self.iteration, path = %path.display(), "checkpoint saved"),
            Err(e) => warn!(iteration = self.iteration, error = %e, "checkpoint failed"),
        }
    }

    fn reached_limit(&self, start: u64) -> bool {
        self.config
            .max_iterations
            .is_some_and(|max| self.iteration - start >= max)
    }

    /// Train until shutdown is requested or `max_iterations` is reached.
    ///
    /// A failed iteration is abandoned and the next one resamples. After
    /// `max_consecutive_failures` approximator failures in a row the loop
    /// returns [`TrainingError::PersistentFailure`].
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<TrainerReport, TrainingError> {
        let start = self.iteration;
        let started_at = Instant::now();
        let mut consecutive_failures = 0;
        info!(
            start_iteration = start,
            batch_size = self.config.batch_size,
            gamma = self.config.gamma,
            sync_interval = self.config.sync_interval,
            "trainer started"
        );

        while !shutdown.is_requested() && !self.reached_limit(start) {
            match self.train_step() {
                Ok(Some(_)) => {
                    consecutive_failures = 0;
                    if self.iteration % self.config.log_interval as u64 == 0 {
                        let window = self.config.log_interval;
                        info!(
                            iteration = self.iteration,
                            updates = self.metrics.total_updates(),
                            loss = self.metrics.average_loss(window),
                            accuracy = self.metrics.average_accuracy(window).unwrap_or(f32::NAN),
                            replay_len = self.replay.len(),
                            policy_version = self.store.version(),
                            elapsed_s = started_at.elapsed().as_secs(),
                            "training progress"
                        );
                    }
                }
                Ok(None) => {
                    debug!(replay_len = self.replay.len(), "waiting for replay buffer");
                }
                Err(TrainingError::Approximator(e)) => {
                    consecutive_failures += 1;
                    self.failures += 1;
                    warn!(
                        iteration = self.iteration,
                        consecutive_failures,
                        error = %e,
                        "training iteration abandoned"
                    );
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        error!(failures = consecutive_failures, "trainer giving up");
                        return Err(TrainingError::PersistentFailure {
                            failures: consecutive_failures,
                            last: e,
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            iterations = self.iteration - start,
            final_iteration = self.iteration,
            "trainer stopped"
        );
        Ok(TrainerReport {
            iterations: self.iteration - start,
            final_iteration: self.iteration,
            policy_version: self.store.version(),
            average_loss: self.metrics.average_loss(self.config.log_interval),
            failures: self.failures,
        })
    }
}
