use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;

use crate::ai::approximator::{argmax_agreement, FitMetrics, QBatch, QFunction};
use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::ai::state_encoding::{decode_q_values, encode_batch, encode_targets};
use crate::error::ApproximatorError;
use crate::game::{Observation, Table};

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;
type Device = <TrainBackend as Backend>::Device;

const WEIGHTS_FILE: &str = "q_network";

/// Network and optimizer hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub hidden_size: usize,
    pub hidden_layers: usize,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 1e-3,
            hidden_size: 64,
            hidden_layers: 3,
        }
    }
}

/// Burn-backed Q-function: MLP trained with Adam on mean squared error.
///
/// Clones share the current weights but start with fresh optimizer state.
pub struct DqnModel {
    network: QNetwork<TrainBackend>,
    optimizer: OptimizerAdaptor<Adam, QNetwork<TrainBackend>, TrainBackend>,
    config: DqnConfig,
    state_size: usize,
    action_count: usize,
    device: Device,
}

impl DqnModel {
    pub fn new(config: DqnConfig, state_size: usize, action_count: usize) -> Self {
        let device = Default::default();
        let network = Self::network_config(&config, state_size, action_count).init(&device);
        DqnModel {
            network,
            optimizer: AdamConfig::new().init(),
            config,
            state_size,
            action_count,
            device,
        }
    }

    /// Model sized for the card table's observation and action spaces.
    pub fn for_table(config: DqnConfig) -> Self {
        Self::new(config, Table::state_size(), Table::action_count())
    }

    fn network_config(config: &DqnConfig, state_size: usize, action_count: usize) -> QNetworkConfig {
        QNetworkConfig::new(state_size, action_count)
            .with_hidden_size(config.hidden_size)
            .with_hidden_layers(config.hidden_layers)
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }
}

impl Clone for DqnModel {
    fn clone(&self) -> Self {
        DqnModel {
            network: self.network.clone(),
            optimizer: AdamConfig::new().init(),
            config: self.config.clone(),
            state_size: self.state_size,
            action_count: self.action_count,
            device: self.device.clone(),
        }
    }
}

impl QFunction for DqnModel {
    type Weights = QNetwork<TrainBackend>;

    fn action_count(&self) -> usize {
        self.action_count
    }

    fn predict(&self, states: &[Observation]) -> Result<QBatch, ApproximatorError> {
        if states.is_empty() {
            return Ok(QBatch::zeros(0, self.action_count));
        }
        let input = encode_batch::<InferBackend>(states, self.state_size, &self.device)?;
        let output = self.network.valid().forward(input);
        let q = decode_q_values(output, self.action_count)?;
        q.expect_shape(states.len(), self.action_count)?;
        Ok(q)
    }

    fn fit(
        &mut self,
        states: &[Observation],
        targets: &QBatch,
    ) -> Result<FitMetrics, ApproximatorError> {
        targets.expect_shape(states.len(), self.action_count)?;
        if states.is_empty() {
            return Ok(FitMetrics::default());
        }

        let input = encode_batch::<TrainBackend>(states, self.state_size, &self.device)?;
        let target = encode_targets::<TrainBackend>(targets, &self.device);
        let output = self.network.forward(input);
        let predicted = decode_q_values(output.clone(), self.action_count)?;

        // MSE over every action slot; untouched slots already equal their prediction.
        let diff = output - target;
        let loss = (diff.clone() * diff).mean();

        let loss_val = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ApproximatorError::Backend(format!("{e:?}")))?
            .first()
            .copied()
            .ok_or_else(|| ApproximatorError::Backend("empty loss tensor".into()))?;
        if !loss_val.is_finite() {
            return Err(ApproximatorError::Backend(format!("non-finite loss {loss_val}")));
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);
        self.network = self
            .optimizer
            .step(self.config.learning_rate, self.network.clone(), grads);

        Ok(FitMetrics {
            loss: loss_val,
            accuracy: Some(argmax_agreement(&predicted, targets)),
        })
    }

    fn weights(&self) -> Self::Weights {
        self.network.clone()
    }

    fn set_weights(&mut self, weights: Self::Weights) {
        self.network = weights;
    }

    fn save_to_dir(&self, dir: &Path) -> Result<(), ApproximatorError> {
        let recorder = DefaultRecorder::default();
        self.network
            .clone()
            .valid()
            .save_file(dir.join(WEIGHTS_FILE), &recorder)
            .map_err(|e| ApproximatorError::Persistence(format!("{e:?}")))
    }

    fn load_from_dir(&mut self, dir: &Path) -> Result<(), ApproximatorError> {
        let recorder = DefaultRecorder::default();
        let network: QNetwork<TrainBackend> =
            Self::network_config(&self.config, self.state_size, self.action_count)
                .init(&self.device)
                .load_file(dir.join(WEIGHTS_FILE), &recorder, &self.device)
                .map_err(|e| ApproximatorError::Persistence(format!("{e:?}")))?;
        self.network = network;
        self.optimizer = AdamConfig::new().init();
        Ok(())
    }
}
