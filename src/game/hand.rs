use rand::Rng;

use super::card::{Card, CARDS, NUM_CARDS};

/// A multiset over the card universe, stored as per-card counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    counts: [u32; NUM_CARDS],
    total: u32,
}

impl Hand {
    pub fn new() -> Self {
        Hand {
            counts: [0; NUM_CARDS],
            total: 0,
        }
    }

    /// Build a hand from explicit cards.
    pub fn from_cards(cards: &[Card]) -> Self {
        let mut hand = Hand::new();
        for card in cards {
            hand.add(card.index());
        }
        hand
    }

    /// Deal `size` cards drawn uniformly from the universe.
    pub fn deal<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Self {
        let mut hand = Hand::new();
        hand.draw(rng, size);
        hand
    }

    /// Draw `count` cards uniformly at random from the (unbounded) universe.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) {
        for _ in 0..count {
            self.add(rng.random_range(0..NUM_CARDS));
        }
    }

    pub fn add(&mut self, index: usize) {
        self.counts[index] += 1;
        self.total += 1;
    }

    /// Remove one copy of the card at `index`. Returns false if none are held.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.counts[index] == 0 {
            return false;
        }
        self.counts[index] -= 1;
        self.total -= 1;
        true
    }

    pub fn count(&self, index: usize) -> u32 {
        self.counts[index]
    }

    pub fn counts(&self) -> &[u32; NUM_CARDS] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.total as usize
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Iterate held cards with their counts.
    pub fn cards(&self) -> impl Iterator<Item = (Card, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(i, &n)| (CARDS[i], n))
    }
}

impl Default for Hand {
    fn default() -> Self {
        Self::new()
    }
}
