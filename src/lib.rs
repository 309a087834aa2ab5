//! # ML Uno
//!
//! An Uno-style card game rules engine with a multi-worker deep Q-learning
//! trainer. Collector threads play self-play episodes with an epsilon-greedy
//! policy and feed a shared replay buffer; a single trainer samples batches,
//! fits a Q-network built on Burn, and publishes versioned weights back to the
//! collectors.
//!
//! ## Modules
//!
//! - [`game`]: Rules engine: cards, hands, players, the table state machine
//! - [`ai`]: Q-function abstraction, DQN model, agents, state encoding
//! - [`training`]: Replay buffer, policy store, collectors, trainer, sessions
//! - [`checkpoint`]: Model persistence and resume
//! - [`config`]: TOML configuration loading and validation
//! - [`logging`]: Tracing subscriber setup
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod training;
