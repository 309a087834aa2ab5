use std::path::Path;

use crate::error::ApproximatorError;
use crate::game::Observation;

/// Row-major batch of Q-value vectors, one row per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct QBatch {
    values: Vec<f32>,
    action_count: usize,
}

impl QBatch {
    pub fn new(values: Vec<f32>, action_count: usize) -> Result<Self, ApproximatorError> {
        if action_count == 0 || values.len() % action_count != 0 {
            return Err(ApproximatorError::Shape {
                expected: format!("rows x {action_count}"),
                actual: format!("{} values", values.len()),
            });
        }
        Ok(QBatch {
            values,
            action_count,
        })
    }

    pub fn zeros(rows: usize, action_count: usize) -> Self {
        QBatch {
            values: vec![0.0; rows * action_count],
            action_count,
        }
    }

    pub fn rows(&self) -> usize {
        self.values.len() / self.action_count
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.action_count..(i + 1) * self.action_count]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.values[i * self.action_count..(i + 1) * self.action_count]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Max over actions for every row.
    pub fn max_per_row(&self) -> Vec<f32> {
        self.values
            .chunks(self.action_count)
            .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .collect()
    }

    /// Fail unless this batch is exactly `rows x action_count`.
    pub fn expect_shape(&self, rows: usize, action_count: usize) -> Result<(), ApproximatorError> {
        if self.action_count != action_count || self.rows() != rows {
            return Err(ApproximatorError::Shape {
                expected: format!("{rows} x {action_count}"),
                actual: format!("{} x {}", self.rows(), self.action_count),
            });
        }
        Ok(())
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Argmax restricted to `candidates`. Falls back to the first candidate.
pub fn argmax_over(values: &[f32], candidates: &[usize]) -> Option<usize> {
    candidates.iter().copied().fold(None, |best, a| match best {
        Some(b) if values[b] >= values[a] => Some(b),
        _ => Some(a),
    })
}

/// Fraction of rows where the predicted and target argmax agree.
pub fn argmax_agreement(predicted: &QBatch, targets: &QBatch) -> f32 {
    let rows = predicted.rows().min(targets.rows());
    if rows == 0 {
        return 0.0;
    }
    let hits = (0..rows)
        .filter(|&i| argmax(predicted.row(i)) == argmax(targets.row(i)))
        .count();
    hits as f32 / rows as f32
}

/// Metrics from one fitting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitMetrics {
    pub loss: f32,
    pub accuracy: Option<f32>,
}

/// A Q-value function approximator.
///
/// `predict` must not mutate weights; `fit` runs one update pass over the
/// batch. Weight snapshots are owned values so they can be handed between
/// threads and installed with `set_weights`.
pub trait QFunction: Send + 'static {
    type Weights: Clone + Send + 'static;

    fn action_count(&self) -> usize;

    fn predict(&self, states: &[Observation]) -> Result<QBatch, ApproximatorError>;

    fn fit(&mut self, states: &[Observation], targets: &QBatch)
        -> Result<FitMetrics, ApproximatorError>;

    fn weights(&self) -> Self::Weights;

    fn set_weights(&mut self, weights: Self::Weights);

    fn save_to_dir(&self, dir: &Path) -> Result<(), ApproximatorError>;

    fn load_from_dir(&mut self, dir: &Path) -> Result<(), ApproximatorError>;

    /// Q-values for a single observation.
    fn predict_one(&self, state: &Observation) -> Result<Vec<f32>, ApproximatorError> {
        let batch = self.predict(std::slice::from_ref(state))?;
        batch.expect_shape(1, self.action_count())?;
        Ok(batch.row(0).to_vec())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Predicts the same row for every state. Fitting replaces the row with
    /// the column means of the targets.
    #[derive(Debug, Clone)]
    pub struct MeanQ {
        pub row: Vec<f32>,
        pub fits: usize,
        /// Number of upcoming `predict` calls that fail. Shared between clones.
        pub failures: Arc<AtomicUsize>,
    }

    impl MeanQ {
        pub fn new(row: Vec<f32>) -> Self {
            MeanQ {
                row,
                fits: 0,
                failures: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl QFunction for MeanQ {
        type Weights = Vec<f32>;

        fn action_count(&self) -> usize {
            self.row.len()
        }

        fn predict(&self, states: &[Observation]) -> Result<QBatch, ApproximatorError> {
            let pending = self.failures.load(Ordering::SeqCst);
            if pending > 0 {
                self.failures.store(pending - 1, Ordering::SeqCst);
                return Err(ApproximatorError::Backend("injected failure".into()));
            }
            let values = states.iter().flat_map(|_| self.row.iter().copied()).collect();
            QBatch::new(values, self.row.len())
        }

        fn fit(
            &mut self,
            states: &[Observation],
            targets: &QBatch,
        ) -> Result<FitMetrics, ApproximatorError> {
            targets.expect_shape(states.len(), self.row.len())?;
            let rows = targets.rows().max(1) as f32;
            let mut means = vec![0.0; self.row.len()];
            for i in 0..targets.rows() {
                for (m, v) in means.iter_mut().zip(targets.row(i)) {
                    *m += v / rows;
                }
            }
            let loss = (0..targets.rows())
                .flat_map(|i| targets.row(i).iter().zip(&self.row).map(|(t, p)| (t - p).powi(2)))
                .sum::<f32>()
                / (rows * self.row.len() as f32);
            self.row = means;
            self.fits += 1;
            Ok(FitMetrics {
                loss,
                accuracy: None,
            })
        }

        fn weights(&self) -> Vec<f32> {
            self.row.clone()
        }

        fn set_weights(&mut self, weights: Vec<f32>) {
            self.row = weights;
        }

        fn save_to_dir(&self, dir: &Path) -> Result<(), ApproximatorError> {
            let json = serde_json::to_string(&self.row)
                .map_err(|e| ApproximatorError::Persistence(e.to_string()))?;
            fs::write(dir.join("mean_q.json"), json)?;
            Ok(())
        }

        fn load_from_dir(&mut self, dir: &Path) -> Result<(), ApproximatorError> {
            let json = fs::read_to_string(dir.join("mean_q.json"))?;
            self.row = serde_json::from_str(&json)
                .map_err(|e| ApproximatorError::Persistence(e.to_string()))?;
            Ok(())
        }
    }
}
