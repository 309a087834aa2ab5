//! Training infrastructure: replay buffer, versioned policy store, collector
//! workers, the Q-learning trainer, session orchestration, metrics, and
//! evaluation against safe bots.

pub mod collector;
pub mod evaluation;
pub mod metrics;
pub mod policy_store;
pub mod replay_buffer;
pub mod session;
pub mod trainer;

pub use collector::{
    Collector, CollectorConfig, EpsilonSchedule, ExplorationMode, RefreshPolicy, WorkerStats,
};
pub use evaluation::{evaluate, play_eval_game, EvaluationReport, GameOutcome};
pub use metrics::{EpisodeResult, MetricsSink, NullSink, TracingSink, TrainingMetrics};
pub use policy_store::PolicyStore;
pub use replay_buffer::{ReplayBuffer, SharedReplay};
pub use session::{Session, SessionConfig, SessionReport, ShutdownSignal};
pub use trainer::{bellman_targets, Trainer, TrainerConfig, TrainerReport};
