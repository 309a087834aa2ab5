use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::ai::{argmax, argmax_over, QFunction, Transition};
use crate::error::{ApproximatorError, TrainingError};
use crate::game::{GameConfig, Observation, StepStatus, Table, ACTION_COUNT, DRAW_ACTION};
use crate::training::metrics::{EpisodeResult, MetricsSink, TrainingMetrics};
use crate::training::policy_store::PolicyStore;
use crate::training::replay_buffer::SharedReplay;
use crate::training::session::ShutdownSignal;

/// Which actions a collector may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationMode {
    /// Any action index, legal or not. Illegal picks teach the elimination penalty.
    Unfiltered,
    /// Random and greedy picks are restricted to legal actions.
    LegalOnly,
}

/// When a collector pulls newer policy weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    PerEpisode,
    PerStep,
}

/// Collector worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub num_workers: usize,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    pub exploration: ExplorationMode,
    pub refresh: RefreshPolicy,
    /// Consecutive failed episodes before the worker gives up.
    pub max_consecutive_failures: usize,
    /// Base seed; worker `i` uses `seed + i`. OS entropy when absent.
    pub seed: Option<u64>,
    /// Episodes between progress log lines.
    pub log_interval: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            num_workers: 2,
            epsilon_start: 1.0,
            epsilon_decay: 0.999999,
            epsilon_min: 0.01,
            exploration: ExplorationMode::Unfiltered,
            refresh: RefreshPolicy::PerEpisode,
            max_consecutive_failures: 10,
            seed: None,
            log_interval: 100,
        }
    }
}

/// Multiplicative epsilon decay toward a floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonSchedule {
    value: f32,
    decay: f32,
    min: f32,
}

impl EpsilonSchedule {
    pub fn new(start: f32, decay: f32, min: f32) -> Self {
        EpsilonSchedule {
            value: start,
            decay,
            min,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn decay(&mut self) {
        self.value = (self.value * self.decay).max(self.min);
    }
}

/// Lifetime counters for one collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    pub worker: usize,
    pub episodes: u64,
    pub transitions: u64,
    pub eliminations: u64,
    pub failures: u64,
    pub final_epsilon: f32,
    pub policy_version: u64,
}

/// One collection worker: owns a table and a local copy of the policy, and
/// feeds transitions into the shared replay buffer.
pub struct Collector<M: QFunction> {
    id: usize,
    table: Table,
    model: M,
    seen_version: u64,
    policy: Arc<PolicyStore<M::Weights>>,
    replay: Arc<SharedReplay>,
    epsilon: EpsilonSchedule,
    config: CollectorConfig,
    rng: StdRng,
    sink: Arc<dyn MetricsSink>,
    metrics: TrainingMetrics,
    stats: WorkerStats,
}

impl<M: QFunction> Collector<M> {
    pub fn new(
        id: usize,
        game: GameConfig,
        model: M,
        policy: Arc<PolicyStore<M::Weights>>,
        replay: Arc<SharedReplay>,
        config: CollectorConfig,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let (table, rng) = match config.seed {
            Some(seed) => {
                let seed = seed.wrapping_add(id as u64);
                (
                    Table::seeded(game, seed),
                    StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
                )
            }
            None => (Table::new(game), StdRng::from_os_rng()),
        };
        let epsilon =
            EpsilonSchedule::new(config.epsilon_start, config.epsilon_decay, config.epsilon_min);
        let metrics = TrainingMetrics::with_capacity(config.log_interval.max(1));
        Collector {
            id,
            table,
            model,
            seen_version: 0,
            policy,
            replay,
            epsilon,
            config,
            rng,
            sink,
            metrics,
            stats: WorkerStats {
                worker: id,
                ..WorkerStats::default()
            },
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon.value()
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Rolling reward and length window over the last `log_interval` episodes.
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Epsilon decay starts once a trained policy has been installed.
    fn policy_initialized(&self) -> bool {
        self.seen_version >= 1
    }

    /// Install newer policy weights, if any were published.
    fn refresh_policy(&mut self) {
        if let Some((version, weights)) = self.policy.snapshot_if_newer(self.seen_version) {
            self.model.set_weights(weights);
            self.seen_version = version;
        }
    }

    fn choose_action(&mut self, observation: &Observation) -> Result<usize, ApproximatorError> {
        let explore = self.rng.random::<f32>() < self.epsilon.value();
        match (self.config.exploration, explore) {
            (ExplorationMode::Unfiltered, true) => Ok(self.rng.random_range(0..ACTION_COUNT)),
            (ExplorationMode::Unfiltered, false) => Ok(argmax(&self.model.predict_one(observation)?)),
            (ExplorationMode::LegalOnly, true) => {
                let legal = self.table.legal_actions();
                Ok(legal[self.rng.random_range(0..legal.len())])
            }
            (ExplorationMode::LegalOnly, false) => {
                let q = self.model.predict_one(observation)?;
                Ok(argmax_over(&q, &self.table.legal_actions()).unwrap_or(DRAW_ACTION))
            }
        }
    }

    /// Play one episode, pushing every transition to the replay buffer.
    ///
    /// Returns `None` when shutdown interrupts the episode. An approximator
    /// error abandons the episode; transitions already pushed stay.
    pub fn run_episode(
        &mut self,
        shutdown: &ShutdownSignal,
    ) -> Result<Option<EpisodeResult>, TrainingError> {
        if self.config.refresh == RefreshPolicy::PerEpisode {
            self.refresh_policy();
        }

        let mut observation = self.table.reset();
        let mut cumulative_reward = 0.0;
        let mut game_length = 0;

        while !self.table.is_terminal() {
            if shutdown.is_requested() {
                return Ok(None);
            }
            if self.config.refresh == RefreshPolicy::PerStep {
                self.refresh_policy();
            }

            let action = self.choose_action(&observation)?;
            let result = self.table.step(action)?;
            if result.info.status == StepStatus::Eliminated {
                self.stats.eliminations += 1;
            }

            self.replay.push(Transition {
                state: observation,
                action,
                reward: result.reward,
                next_state: result.observation.clone(),
                terminal: result.terminal,
            });
            self.stats.transitions += 1;

            cumulative_reward += result.reward;
            game_length += 1;
            if self.policy_initialized() {
                self.epsilon.decay();
            }
            observation = result.observation;
        }

        Ok(Some(EpisodeResult {
            cumulative_reward,
            game_length,
        }))
    }

    fn report(&self, result: &EpisodeResult) {
        let step = self.stats.episodes;
        let length = result.game_length.max(1) as f64;
        self.sink
            .scalar("cumulative_reward", result.cumulative_reward as f64, step);
        self.sink
            .scalar("mean_reward", result.cumulative_reward as f64 / length, step);
        self.sink.scalar("game_length", result.game_length as f64, step);
        self.sink.scalar("epsilon", self.epsilon.value() as f64, step);
    }

    fn finish_episode(&mut self, result: EpisodeResult) {
        self.stats.episodes += 1;
        self.metrics.record_episode(result);
        self.report(&result);
        debug!(
            worker = self.id,
            episode = self.stats.episodes,
            reward = result.cumulative_reward,
            length = result.game_length,
            "episode finished"
        );
        let window = self.config.log_interval;
        if window > 0 && self.stats.episodes % window as u64 == 0 {
            info!(
                worker = self.id,
                episodes = self.metrics.total_episodes(),
                transitions = self.stats.transitions,
                average_reward = self.metrics.average_reward(window),
                average_game_length = self.metrics.average_game_length(window),
                epsilon = self.epsilon.value(),
                policy_version = self.seen_version,
                "collector progress"
            );
        }
    }

    /// Collect episodes until shutdown is requested.
    ///
    /// Approximator failures are retried on the next episode. After
    /// `max_consecutive_failures` in a row, or on any other error, the worker
    /// requests shutdown and returns the error.
    pub fn run(mut self, shutdown: ShutdownSignal) -> Result<WorkerStats, TrainingError> {
        info!(worker = self.id, epsilon = self.epsilon.value(), "collector started");
        let mut consecutive_failures = 0;

        while !shutdown.is_requested() {
            match self.run_episode(&shutdown) {
                Ok(Some(result)) => {
                    consecutive_failures = 0;
                    self.finish_episode(result);
                }
                Ok(None) => break,
                Err(TrainingError::Approximator(e)) => {
                    consecutive_failures += 1;
                    self.stats.failures += 1;
                    warn!(
                        worker = self.id,
                        consecutive_failures,
                        error = %e,
                        "episode abandoned"
                    );
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        error!(worker = self.id, "collector giving up");
                        shutdown.request();
                        return Err(TrainingError::PersistentFailure {
                            failures: consecutive_failures,
                            last: e,
                        });
                    }
                }
                Err(e) => {
                    error!(worker = self.id, error = %e, "collector failed");
                    shutdown.request();
                    return Err(e);
                }
            }
        }

        self.stats.final_epsilon = self.epsilon.value();
        self.stats.policy_version = self.seen_version;
        info!(
            worker = self.id,
            episodes = self.stats.episodes,
            transitions = self.stats.transitions,
            "collector stopped"
        );
        Ok(self.stats)
    }
}
