use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Rolling average loss over the trainer's log window.
    pub loss: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
    pub replay_len: usize,
}

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub learning_rate: f64,
    pub hidden_size: usize,
    pub hidden_layers: usize,
    pub gamma: f32,
    pub batch_size: usize,
    pub sync_interval: usize,
    pub replay_capacity: usize,
    pub player_count: usize,
}

/// Trainer counters written to training_state.json and restored on resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingState {
    pub iteration: u64,
    pub policy_version: u64,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub iteration: u64,
    pub policy_version: u64,
    pub timestamp: u64,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: CheckpointHyperparameters,
}

impl CheckpointMetadata {
    /// Metadata stamped with the current wall-clock time.
    pub fn now(
        state: TrainingState,
        metrics: CheckpointMetrics,
        hyperparameters: CheckpointHyperparameters,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        CheckpointMetadata {
            iteration: state.iteration,
            policy_version: state.policy_version,
            timestamp,
            metrics,
            hyperparameters,
        }
    }

    pub fn training_state(&self) -> TrainingState {
        TrainingState {
            iteration: self.iteration,
            policy_version: self.policy_version,
        }
    }
}
