mod agent;
pub mod algorithms;
pub mod approximator;
pub mod networks;
mod random;
pub mod state_encoding;

pub use agent::{Agent, GreedyAgent, Transition};
pub use algorithms::{DqnConfig, DqnModel};
pub use approximator::{argmax, argmax_agreement, argmax_over, FitMetrics, QBatch, QFunction};
pub use networks::{QNetwork, QNetworkConfig};
pub use random::SafeAgent;
