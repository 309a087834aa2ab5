//! Core card-game logic: the fixed card universe, multiset hands, and the
//! table state machine with its observation encoding.

mod card;
mod hand;
mod observation;
mod player;
mod table;

pub use card::{
    Card, Color, Rank, ACTION_COUNT, CARDS, COLORED_RANKS, DRAW_ACTION, NUM_CARDS, STATE_SIZE,
};
pub use hand::Hand;
pub use observation::{encode_observation, Observation};
pub use player::Player;
pub use table::{
    Direction, GameConfig, Phase, RewardConfig, SeatView, StepInfo, StepResult, StepStatus,
    Table, TableSnapshot, WildColorPolicy,
};
