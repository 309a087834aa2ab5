use std::collections::VecDeque;

use tracing::{event, Level};

/// Receives named scalar observations tagged with a step counter.
///
/// Fire-and-forget: implementations must not fail or block the caller.
pub trait MetricsSink: Send + Sync {
    fn scalar(&self, name: &str, value: f64, step: u64);
}

/// Emits every scalar as a structured tracing event under the `metrics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn scalar(&self, name: &str, value: f64, step: u64) {
        event!(target: "metrics", Level::DEBUG, name, value, step);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn scalar(&self, _name: &str, _value: f64, _step: u64) {}
}

/// Result of a single collected episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    /// Sum of rewards over every step of the episode.
    pub cumulative_reward: f32,
    pub game_length: usize,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    update_losses: VecDeque<f32>,
    update_accuracies: VecDeque<f32>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    total_updates: usize,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            update_accuracies: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            total_updates: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    fn push_capped<T>(window: &mut VecDeque<T>, capacity: usize, value: T) {
        window.push_back(value);
        if window.len() > capacity {
            window.pop_front();
        }
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        Self::push_capped(&mut self.episode_results, self.capacity, result);
    }

    pub fn record_update(&mut self, loss: f32, accuracy: Option<f32>) {
        self.total_updates += 1;
        Self::push_capped(&mut self.update_losses, self.capacity, loss);
        if let Some(acc) = accuracy {
            Self::push_capped(&mut self.update_accuracies, self.capacity, acc);
        }
    }

    fn mean_of_last(
        values: impl DoubleEndedIterator<Item = f32> + ExactSizeIterator,
        last_n: usize,
    ) -> f32 {
        let n = values.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        values.rev().take(n).sum::<f32>() / n as f32
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f32 {
        Self::mean_of_last(self.update_losses.iter().copied(), last_n)
    }

    /// Average accuracy over the last N updates that reported one.
    pub fn average_accuracy(&self, last_n: usize) -> Option<f32> {
        if self.update_accuracies.is_empty() {
            return None;
        }
        Some(Self::mean_of_last(self.update_accuracies.iter().copied(), last_n))
    }

    /// Average cumulative reward over the last N episodes.
    pub fn average_reward(&self, last_n: usize) -> f32 {
        Self::mean_of_last(
            self.episode_results.iter().map(|r| r.cumulative_reward),
            last_n,
        )
    }

    /// Average game length over the last N episodes.
    pub fn average_game_length(&self, last_n: usize) -> f32 {
        Self::mean_of_last(
            self.episode_results.iter().map(|r| r.game_length as f32),
            last_n,
        )
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::MetricsSink;

    /// Records every scalar for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<(String, f64, u64)>>,
    }

    impl RecordingSink {
        pub fn values(&self, name: &str) -> Vec<f64> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(n, _, _)| n == name)
                .map(|&(_, v, _)| v)
                .collect()
        }
    }

    impl MetricsSink for RecordingSink {
        fn scalar(&self, name: &str, value: f64, step: u64) {
            self.events.lock().unwrap().push((name.to_string(), value, step));
        }
    }
}
