use burn::prelude::*;
use burn::tensor::TensorData;

use crate::ai::approximator::QBatch;
use crate::error::ApproximatorError;
use crate::game::Observation;

/// Stack observations into a `[batch, width]` tensor.
pub fn encode_batch<B: Backend>(
    states: &[Observation],
    width: usize,
    device: &B::Device,
) -> Result<Tensor<B, 2>, ApproximatorError> {
    let mut flat = Vec::with_capacity(states.len() * width);
    for (i, state) in states.iter().enumerate() {
        if state.len() != width {
            return Err(ApproximatorError::Shape {
                expected: format!("observation of length {width}"),
                actual: format!("observation {i} of length {}", state.len()),
            });
        }
        flat.extend_from_slice(state);
    }
    Ok(Tensor::from_data(
        TensorData::new(flat, [states.len(), width]),
        device,
    ))
}

/// Convert a target batch into a `[rows, actions]` tensor.
pub fn encode_targets<B: Backend>(targets: &QBatch, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(
        TensorData::new(
            targets.as_slice().to_vec(),
            [targets.rows(), targets.action_count()],
        ),
        device,
    )
}

/// Read a `[rows, actions]` tensor back into a [`QBatch`].
pub fn decode_q_values<B: Backend>(
    tensor: Tensor<B, 2>,
    action_count: usize,
) -> Result<QBatch, ApproximatorError> {
    let values: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| ApproximatorError::Backend(format!("{e:?}")))?;
    QBatch::new(values, action_count)
}
