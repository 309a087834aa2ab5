mod dqn;

pub use dqn::{DqnConfig, DqnModel};
