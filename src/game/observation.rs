use super::card::{Card, NUM_CARDS, STATE_SIZE};
use super::hand::Hand;

/// Flat observation vector of length [`STATE_SIZE`].
pub type Observation = Vec<f32>;

/// Encode the table as seen by the player holding the turn.
///
/// Layout: one-hot of the top card's universe slot, the player's per-card
/// counts, then the pending draw count. A missing hand (no active player)
/// encodes as all-zero counts.
pub fn encode_observation(top_card: Card, hand: Option<&Hand>, draw_pending: u32) -> Observation {
    let mut data = vec![0.0f32; STATE_SIZE];
    data[top_card.index()] = 1.0;
    if let Some(hand) = hand {
        for (slot, &count) in data[NUM_CARDS..2 * NUM_CARDS]
            .iter_mut()
            .zip(hand.counts().iter())
        {
            *slot = count as f32;
        }
    }
    data[2 * NUM_CARDS] = draw_pending as f32;
    data
}
