use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::QFunction;
use crate::checkpoint::metadata::{CheckpointMetadata, TrainingState};
use crate::error::CheckpointError;

const LATEST: &str = "latest";
const METADATA_FILE: &str = "metadata.json";
const TRAINING_STATE_FILE: &str = "training_state.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    /// When false the trainer never writes checkpoints.
    pub enabled: bool,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            enabled: true,
        }
    }
}

/// A checkpoint read back from disk. Weights stay on disk until
/// [`restore_into`](Self::restore_into).
#[derive(Debug)]
pub struct LoadedCheckpoint {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state: TrainingState,
}

impl LoadedCheckpoint {
    /// Load the stored weights into `model`.
    pub fn restore_into<M: QFunction>(&self, model: &mut M) -> Result<(), CheckpointError> {
        model
            .load_from_dir(&self.path)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    /// Create the manager, creating the checkpoint directory if needed.
    pub fn new(config: CheckpointManagerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(CheckpointManager { config })
    }

    /// Open an existing checkpoint directory for reading.
    pub fn open(config: CheckpointManagerConfig) -> Result<Self, CheckpointError> {
        if !config.checkpoint_dir.is_dir() {
            return Err(CheckpointError::DirNotFound(config.checkpoint_dir));
        }
        Ok(CheckpointManager { config })
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Write weights, training state and metadata, then publish the
    /// directory with a rename and move the `latest` pointer.
    pub fn save_checkpoint<M: QFunction>(
        &self,
        model: &M,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", metadata.iteration);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{dir_name}.tmp"));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        fs::create_dir_all(&tmp_dir)?;

        model
            .save_to_dir(&tmp_dir)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;

        let state_json = serde_json::to_string_pretty(&metadata.training_state())?;
        fs::write(tmp_dir.join(TRAINING_STATE_FILE), state_json)?;

        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(tmp_dir.join(METADATA_FILE), meta_json)?;

        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest(&dir_name)?;
        self.prune_old_checkpoints()?;

        Ok(final_dir)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: PathBuf) -> Result<T, CheckpointError> {
        let json = fs::read_to_string(&path).map_err(|e| CheckpointError::MetadataRead {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse { path, source: e })
    }

    /// Read metadata and training state from a checkpoint directory.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<LoadedCheckpoint, CheckpointError> {
        let metadata: CheckpointMetadata = Self::read_json(dir.join(METADATA_FILE))?;
        let training_state: TrainingState = Self::read_json(dir.join(TRAINING_STATE_FILE))?;
        Ok(LoadedCheckpoint {
            path: dir.to_path_buf(),
            metadata,
            training_state,
        })
    }

    /// Load the checkpoint the `latest` pointer refers to.
    pub fn load_latest(&self) -> Result<LoadedCheckpoint, CheckpointError> {
        let target = self.resolve_latest()?;
        self.load_checkpoint(&target)
    }

    /// List all checkpoints sorted by iteration (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || path.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata: CheckpointMetadata = Self::read_json(meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.iteration);
        Ok(results)
    }

    /// Delete everything but the newest `keep_last_n` checkpoints.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        let excess = checkpoints.len().saturating_sub(self.config.keep_last_n);
        for (path, _) in checkpoints.into_iter().take(excess) {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn latest_path(&self) -> PathBuf {
        self.config.checkpoint_dir.join(LATEST)
    }

    #[cfg(unix)]
    fn update_latest(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.latest_path();
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }

    // Plain text pointer where symlinks need elevated rights.
    #[cfg(not(unix))]
    fn update_latest(&self, dir_name: &str) -> Result<(), CheckpointError> {
        fs::write(self.latest_path(), dir_name)?;
        Ok(())
    }

    fn resolve_latest(&self) -> Result<PathBuf, CheckpointError> {
        let latest = self.latest_path();
        let meta = latest
            .symlink_metadata()
            .map_err(|_| CheckpointError::NoLatest(self.config.checkpoint_dir.clone()))?;
        let target = if meta.file_type().is_symlink() {
            fs::read_link(&latest)?
        } else {
            PathBuf::from(fs::read_to_string(&latest)?.trim())
        };
        Ok(if target.is_relative() {
            self.config.checkpoint_dir.join(target)
        } else {
            target
        })
    }
}
