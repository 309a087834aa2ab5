use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::agent::Agent;
use crate::error::ApproximatorError;
use crate::game::{Table, DRAW_ACTION};

/// An agent that selects uniformly at random from legal actions, so it is
/// never eliminated.
pub struct SafeAgent {
    rng: StdRng,
}

impl SafeAgent {
    pub fn new() -> Self {
        SafeAgent {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        SafeAgent {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SafeAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for SafeAgent {
    fn select_action(&mut self, table: &Table) -> Result<usize, ApproximatorError> {
        let actions = table.legal_actions();
        if actions.is_empty() {
            return Ok(DRAW_ACTION);
        }
        Ok(actions[self.rng.random_range(0..actions.len())])
    }

    fn name(&self) -> &str {
        "Safe"
    }
}
