use std::path::PathBuf;

/// Contract violations when driving a table. Illegal card plays are not
/// errors; they eliminate the acting player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("episode is over; call reset before stepping again")]
    EpisodeOver,

    #[error("action {action} out of range (action count {action_count})")]
    InvalidAction { action: usize, action_count: usize },

    #[error("invalid table setup: {0}")]
    InvalidSetup(String),
}

/// Failures raised by a Q-function approximator.
#[derive(Debug, thiserror::Error)]
pub enum ApproximatorError {
    #[error("malformed shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to persist weights: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when saving or loading checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' pointer found in {0}")]
    NoLatest(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that end a training session.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("approximator failed: {0}")]
    Approximator(#[from] ApproximatorError),

    #[error("approximator failed {failures} consecutive times, last error: {last}")]
    PersistentFailure {
        failures: usize,
        last: ApproximatorError,
    },

    #[error("collector worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },

    #[error("game error: {0}")]
    Game(#[from] GameError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::NoLatest(PathBuf::from("checkpoints"));
        assert_eq!(err.to_string(), "no 'latest' pointer found in checkpoints");
    }

    #[test]
    fn test_game_error_display() {
        let err = GameError::InvalidAction {
            action: 60,
            action_count: 55,
        };
        assert_eq!(err.to_string(), "action 60 out of range (action count 55)");
    }

    #[test]
    fn test_persistent_failure_display() {
        let err = TrainingError::PersistentFailure {
            failures: 3,
            last: ApproximatorError::Backend("nan loss".into()),
        };
        assert_eq!(
            err.to_string(),
            "approximator failed 3 consecutive times, last error: backend error: nan loss"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("training.gamma must be in [0, 1]".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: training.gamma must be in [0, 1]"
        );
    }
}
