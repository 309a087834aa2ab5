use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of colored ranks (0-9, reverse, draw-two, skip).
pub const COLORED_RANKS: usize = 13;
/// Number of distinct cards in the universe: 4 colors x 13 ranks + 2 wilds.
pub const NUM_CARDS: usize = Color::ALL.len() * COLORED_RANKS + 2;
/// The action index meaning "draw / pass".
pub const DRAW_ACTION: usize = NUM_CARDS;
/// Number of actions: one per card plus draw.
pub const ACTION_COUNT: usize = NUM_CARDS + 1;
/// Observation length: top-card one-hot, hand counts, pending draw.
pub const STATE_SIZE: usize = 2 * NUM_CARDS + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Yellow, Color::Green, Color::Blue];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Yellow => 'Y',
            Color::Green => 'G',
            Color::Blue => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    Number(u8),
    Reverse,
    DrawTwo,
    Skip,
    Wild,
    WildDrawFour,
}

impl Rank {
    /// Numeric rank code: 0-9 numbers, 10 reverse, 11 +2, 12 skip, 13 wild, 14 +4.
    pub const fn code(self) -> u8 {
        match self {
            Rank::Number(n) => n,
            Rank::Reverse => 10,
            Rank::DrawTwo => 11,
            Rank::Skip => 12,
            Rank::Wild => 13,
            Rank::WildDrawFour => 14,
        }
    }

    pub const fn from_code(code: u8) -> Option<Rank> {
        match code {
            0..=9 => Some(Rank::Number(code)),
            10 => Some(Rank::Reverse),
            11 => Some(Rank::DrawTwo),
            12 => Some(Rank::Skip),
            13 => Some(Rank::Wild),
            14 => Some(Rank::WildDrawFour),
            _ => None,
        }
    }

    pub fn is_wild(self) -> bool {
        matches!(self, Rank::Wild | Rank::WildDrawFour)
    }

    /// Cards owed by the next player when this rank is played, if any.
    pub fn penalty(self) -> Option<u32> {
        match self {
            Rank::DrawTwo => Some(2),
            Rank::WildDrawFour => Some(4),
            _ => None,
        }
    }
}

/// A card. Wild cards carry no color in the universe; the color is resolved
/// when they are played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Card {
    color: Option<Color>,
    rank: Rank,
}

impl Card {
    pub const fn colored(color: Color, rank: Rank) -> Card {
        Card {
            color: Some(color),
            rank,
        }
    }

    pub const WILD: Card = Card {
        color: None,
        rank: Rank::Wild,
    };

    pub const WILD_DRAW_FOUR: Card = Card {
        color: None,
        rank: Rank::WildDrawFour,
    };

    /// The resolved color; `None` only for an unplayed wild.
    pub fn color(self) -> Option<Color> {
        self.color
    }

    pub fn rank(self) -> Rank {
        self.rank
    }

    /// Index of this card's identity in [`CARDS`]. Resolved wilds map back to
    /// their colorless slot.
    pub fn index(self) -> usize {
        match (self.rank, self.color) {
            (Rank::Wild, _) => NUM_CARDS - 2,
            (Rank::WildDrawFour, _) => NUM_CARDS - 1,
            (rank, Some(color)) => color.index() * COLORED_RANKS + rank.code() as usize,
            // Only the wild constants are built without a color.
            (rank, None) => unreachable!("colored rank {rank:?} without a color"),
        }
    }

    /// The same card with its color resolved.
    pub fn with_color(self, color: Color) -> Card {
        Card {
            color: Some(color),
            rank: self.rank,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.rank {
            Rank::Number(n) => n.to_string(),
            Rank::Reverse => "R".to_string(),
            Rank::DrawTwo => "+2".to_string(),
            Rank::Skip => "S".to_string(),
            Rank::Wild => "W".to_string(),
            Rank::WildDrawFour => "W+4".to_string(),
        };
        match (self.color, self.rank.is_wild()) {
            (Some(color), true) => write!(f, "{label}({})", color.symbol()),
            (Some(color), false) => write!(f, "{}{label}", color.symbol()),
            (None, _) => write!(f, "{label}"),
        }
    }
}

/// The fixed card universe, ordered color-major then by rank code, with the
/// two colorless wilds last.
pub const CARDS: [Card; NUM_CARDS] = build_universe();

const fn build_universe() -> [Card; NUM_CARDS] {
    let mut cards = [Card::WILD; NUM_CARDS];
    let mut i = 0;
    while i < NUM_CARDS - 2 {
        let rank = match Rank::from_code((i % COLORED_RANKS) as u8) {
            Some(rank) => rank,
            None => panic!("colored rank code out of range"),
        };
        cards[i] = Card::colored(Color::ALL[i / COLORED_RANKS], rank);
        i += 1;
    }
    cards[NUM_CARDS - 2] = Card::WILD;
    cards[NUM_CARDS - 1] = Card::WILD_DRAW_FOUR;
    cards
}
