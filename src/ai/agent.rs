use crate::ai::approximator::{argmax, argmax_over, QFunction};
use crate::error::ApproximatorError;
use crate::game::{Observation, Table};

/// A single step of experience for RL training.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Observation,
    pub action: usize,
    pub reward: f32,
    pub next_state: Observation,
    pub terminal: bool,
}

/// Anything that can pick an action for the player holding the turn.
pub trait Agent {
    /// Select an action index in `[0, Table::action_count())`.
    fn select_action(&mut self, table: &Table) -> Result<usize, ApproximatorError>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}

/// Plays the action with the highest predicted Q-value.
pub struct GreedyAgent<M> {
    model: M,
    legal_only: bool,
}

impl<M: QFunction> GreedyAgent<M> {
    /// Unfiltered argmax, as used during collection.
    pub fn new(model: M) -> Self {
        GreedyAgent {
            model,
            legal_only: false,
        }
    }

    /// Argmax restricted to the legal actions of the current player.
    pub fn legal_only(model: M) -> Self {
        GreedyAgent {
            model,
            legal_only: true,
        }
    }
}

impl<M: QFunction> Agent for GreedyAgent<M> {
    fn select_action(&mut self, table: &Table) -> Result<usize, ApproximatorError> {
        let q = self.model.predict_one(&table.observation())?;
        if self.legal_only {
            if let Some(action) = argmax_over(&q, &table.legal_actions()) {
                return Ok(action);
            }
        }
        Ok(argmax(&q))
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}
