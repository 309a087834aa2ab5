mod manager;
mod metadata;

pub use manager::{CheckpointManager, CheckpointManagerConfig, LoadedCheckpoint};
pub use metadata::{CheckpointHyperparameters, CheckpointMetadata, CheckpointMetrics, TrainingState};
