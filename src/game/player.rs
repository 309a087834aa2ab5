use super::hand::Hand;

/// A seated player. The seat is fixed at deal time; the player's position in
/// the active list shrinks as others leave the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    seat: usize,
    hand: Hand,
}

impl Player {
    pub fn new(seat: usize, hand: Hand) -> Self {
        Player { seat, hand }
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub(crate) fn hand_mut(&mut self) -> &mut Hand {
        &mut self.hand
    }
}
