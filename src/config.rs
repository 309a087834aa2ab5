use std::path::{Path, PathBuf};

use tracing::warn;

use crate::ai::DqnConfig;
use crate::checkpoint::{CheckpointHyperparameters, CheckpointManagerConfig};
use crate::error::ConfigError;
use crate::game::GameConfig;
use crate::training::{CollectorConfig, SessionConfig, TrainerConfig};

/// Log output settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".into(),
            json: false,
            file: None,
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub dqn: DqnConfig,
    pub collector: CollectorConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
    pub logging: LoggingConfig,
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.into())
}

fn in_unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.player_count < 2 {
            return Err(invalid("game.player_count must be >= 2"));
        }
        if self.game.initial_hand_size == 0 {
            return Err(invalid("game.initial_hand_size must be > 0"));
        }

        if self.dqn.learning_rate <= 0.0 {
            return Err(invalid("dqn.learning_rate must be > 0"));
        }
        if self.dqn.hidden_size == 0 {
            return Err(invalid("dqn.hidden_size must be > 0"));
        }
        if self.dqn.hidden_layers == 0 {
            return Err(invalid("dqn.hidden_layers must be > 0"));
        }

        let c = &self.collector;
        if c.num_workers == 0 {
            return Err(invalid("collector.num_workers must be >= 1"));
        }
        if !in_unit_range(c.epsilon_start) {
            return Err(invalid("collector.epsilon_start must be in [0, 1]"));
        }
        if !in_unit_range(c.epsilon_min) {
            return Err(invalid("collector.epsilon_min must be in [0, 1]"));
        }
        if c.epsilon_min > c.epsilon_start {
            return Err(invalid("collector.epsilon_min must be <= collector.epsilon_start"));
        }
        if c.epsilon_decay <= 0.0 || c.epsilon_decay > 1.0 {
            return Err(invalid("collector.epsilon_decay must be in (0, 1]"));
        }
        if c.max_consecutive_failures == 0 {
            return Err(invalid("collector.max_consecutive_failures must be >= 1"));
        }
        if c.log_interval == 0 {
            return Err(invalid("collector.log_interval must be > 0"));
        }

        let t = &self.training;
        if t.batch_size == 0 {
            return Err(invalid("training.batch_size must be > 0"));
        }
        if t.replay_capacity < t.batch_size {
            return Err(invalid("training.replay_capacity must be >= training.batch_size"));
        }
        if !in_unit_range(t.gamma) {
            return Err(invalid("training.gamma must be in [0, 1]"));
        }
        if t.sync_interval == 0 {
            return Err(invalid("training.sync_interval must be > 0"));
        }
        if t.checkpoint_interval == 0 {
            return Err(invalid("training.checkpoint_interval must be > 0"));
        }
        if t.log_interval == 0 {
            return Err(invalid("training.log_interval must be > 0"));
        }
        if t.poll_interval_ms == 0 {
            return Err(invalid("training.poll_interval_ms must be > 0"));
        }
        if t.max_consecutive_failures == 0 {
            return Err(invalid("training.max_consecutive_failures must be >= 1"));
        }

        if self.checkpoint.keep_last_n == 0 {
            return Err(invalid("checkpoint.keep_last_n must be >= 1"));
        }

        Ok(())
    }

    /// The parts of the config a training session consumes.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            game: self.game.clone(),
            collector: self.collector.clone(),
            trainer: self.training.clone(),
        }
    }

    /// Hyperparameters recorded alongside every checkpoint.
    pub fn checkpoint_hyperparameters(&self) -> CheckpointHyperparameters {
        CheckpointHyperparameters {
            learning_rate: self.dqn.learning_rate,
            hidden_size: self.dqn.hidden_size,
            hidden_layers: self.dqn.hidden_layers,
            gamma: self.training.gamma,
            batch_size: self.training.batch_size,
            sync_interval: self.training.sync_interval,
            replay_capacity: self.training.replay_capacity,
            player_count: self.game.player_count,
        }
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::WildColorPolicy;
    use crate::training::{ExplorationMode, RefreshPolicy};
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_defaults_match_reference_values() {
        let config = AppConfig::default();
        assert_eq!(config.game.player_count, 4);
        assert_eq!(config.game.initial_hand_size, 7);
        assert_eq!(config.training.batch_size, 512);
        assert_eq!(config.training.replay_capacity, 10_000);
        assert!((config.training.gamma - 0.7).abs() < 1e-6);
        assert_eq!(config.training.sync_interval, 20);
        assert_eq!(config.training.checkpoint_interval, 1000);
        assert_eq!(config.collector.num_workers, 2);
        assert!((config.collector.epsilon_min - 0.01).abs() < 1e-6);
        assert!((config.game.rewards.illegal_move + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[dqn]
learning_rate = 0.01

[game.rewards]
player_finished = 10.0
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.dqn.learning_rate - 0.01).abs() < 1e-9);
        assert!((config.game.rewards.player_finished - 10.0).abs() < 1e-6);
        // Other fields should be defaults
        assert!((config.game.rewards.draw_card + 1.0).abs() < 1e-6);
        assert_eq!(config.dqn.hidden_size, 64);
        assert_eq!(config.training.batch_size, 512);
    }

    #[test]
    fn test_policy_enums_parse_snake_case() {
        let toml_str = r#"
[game]
wild_color = "most_held"

[collector]
exploration = "legal_only"
refresh = "per_step"
seed = 42
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.game.wild_color, WildColorPolicy::MostHeld);
        assert_eq!(config.collector.exploration, ExplorationMode::LegalOnly);
        assert_eq!(config.collector.refresh, RefreshPolicy::PerStep);
        assert_eq!(config.collector.seed, Some(42));
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert!((config.dqn.learning_rate - default.dqn.learning_rate).abs() < 1e-9);
        assert_eq!(config.training.max_iterations, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_single_player() {
        let mut config = AppConfig::default();
        config.game.player_count = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_hands() {
        let mut config = AppConfig::default();
        config.game.initial_hand_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.dqn.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_hidden_layers() {
        let mut config = AppConfig::default();
        config.dqn.hidden_layers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_gamma() {
        let mut config = AppConfig::default();
        config.training.gamma = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_batch() {
        let mut config = AppConfig::default();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_replay_capacity_lt_batch() {
        let mut config = AppConfig::default();
        config.training.replay_capacity = 100;
        config.training.batch_size = 200;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("replay_capacity"));
    }

    #[test]
    fn test_validation_rejects_epsilon_start_out_of_range() {
        let mut config = AppConfig::default();
        config.collector.epsilon_start = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_min_gt_start() {
        let mut config = AppConfig::default();
        config.collector.epsilon_start = 0.1;
        config.collector.epsilon_min = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_decay() {
        let mut config = AppConfig::default();
        config.collector.epsilon_decay = 0.0;
        assert!(config.validate().is_err());
        config.collector.epsilon_decay = 1.01;
        assert!(config.validate().is_err());
        config.collector.epsilon_decay = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.collector.num_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_sync_interval() {
        let mut config = AppConfig::default();
        config.training.sync_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_checkpoint_interval() {
        let mut config = AppConfig::default();
        config.training.checkpoint_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.batch_size, 512);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[training]
batch_size = 64
max_iterations = 500

[checkpoint]
checkpoint_dir = "runs/ckpt"
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.batch_size, 64);
        assert_eq!(config.training.max_iterations, Some(500));
        assert_eq!(config.checkpoint.checkpoint_dir, PathBuf::from("runs/ckpt"));
        // Others are defaults
        assert!((config.dqn.learning_rate - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[game]\nplayer_count = 1\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[training\nbatch_size = ").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml().unwrap();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.game.player_count, 4);
        assert_eq!(config.checkpoint.keep_last_n, 5);
    }

    #[test]
    fn test_session_config_mirrors_sections() {
        let mut config = AppConfig::default();
        config.collector.num_workers = 5;
        config.training.gamma = 0.9;
        let session = config.session();
        assert_eq!(session.collector.num_workers, 5);
        assert!((session.trainer.gamma - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_checkpoint_hyperparameters_snapshot() {
        let mut config = AppConfig::default();
        config.game.player_count = 3;
        config.dqn.hidden_size = 128;
        let hyper = config.checkpoint_hyperparameters();
        assert_eq!(hyper.player_count, 3);
        assert_eq!(hyper.hidden_size, 128);
        assert_eq!(hyper.batch_size, config.training.batch_size);
    }
}
