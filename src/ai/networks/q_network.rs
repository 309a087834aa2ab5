use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Fully connected Q-network over flat table observations.
///
/// ```text
/// Input:  [batch, state_size]
/// Hidden: hidden_layers x (Linear -> ReLU), hidden_size units each
/// Output: [batch, action_count]  (linear Q-values, one per action)
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    pub input_size: usize,
    pub output_size: usize,
    #[config(default = 64)]
    pub hidden_size: usize,
    #[config(default = 3)]
    pub hidden_layers: usize,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let mut hidden = Vec::with_capacity(self.hidden_layers);
        let mut width = self.input_size;
        for _ in 0..self.hidden_layers {
            hidden.push(LinearConfig::new(width, self.hidden_size).init(device));
            width = self.hidden_size;
        }
        QNetwork {
            hidden,
            output: LinearConfig::new(width, self.output_size).init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: input [batch, state_size] -> output [batch, action_count].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = self.relu.forward(layer.forward(x));
        }
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_network_output_shape() {
        let device = Default::default();
        let network = QNetworkConfig::new(109, 55).init::<TestBackend>(&device);

        let input = Tensor::zeros([4, 109], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [4, 55]);
    }

    #[test]
    fn test_network_custom_depth() {
        let device = Default::default();
        let network = QNetworkConfig::new(10, 3)
            .with_hidden_size(8)
            .with_hidden_layers(1)
            .init::<TestBackend>(&device);

        let input = Tensor::zeros([1, 10], &device);
        assert_eq!(network.forward(input).shape().dims, [1, 3]);
    }
}
