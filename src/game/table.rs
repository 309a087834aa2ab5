use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::card::{Card, Color, Rank, ACTION_COUNT, CARDS, DRAW_ACTION, NUM_CARDS, STATE_SIZE};
use super::hand::Hand;
use super::observation::{encode_observation, Observation};
use super::player::Player;
use crate::error::GameError;

/// Per-step rewards handed to the acting player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub illegal_move: f32,
    pub draw_card: f32,
    pub card_played: f32,
    pub player_finished: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            illegal_move: -2.0,
            draw_card: -1.0,
            card_played: 2.0,
            player_finished: 5.0,
        }
    }
}

/// How a played wild card gets its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildColorPolicy {
    /// Uniformly random color.
    Random,
    /// The color the player holds most of after playing (random on ties with no colored cards).
    MostHeld,
}

/// Table rules and rewards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player_count: usize,
    pub initial_hand_size: usize,
    pub wild_color: WildColorPolicy,
    pub rewards: RewardConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            player_count: 4,
            initial_hand_size: 7,
            wild_color: WildColorPolicy::Random,
            rewards: RewardConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reversed(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Next index around a table of `len` players.
    fn next(self, index: usize, len: usize) -> usize {
        match self {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => (index + len - 1) % len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Played,
    Drew,
    Eliminated,
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InProgress,
    Terminal,
}

/// Bookkeeping returned alongside each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    /// Index into the active list of the player now holding the turn.
    pub turn: usize,
    /// Seat of the player now holding the turn, if anyone is left.
    pub seat: Option<usize>,
    /// Seat of the player who just acted.
    pub actor: usize,
    pub status: StepStatus,
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub terminal: bool,
    pub info: StepInfo,
}

/// Observation-free view of one seat, for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatView {
    pub seat: usize,
    pub hand_size: usize,
    pub counts: Vec<u32>,
}

/// Observation-free view of the whole table, for renderers and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSnapshot {
    pub top_card: Card,
    pub seats: Vec<SeatView>,
    pub turn_seat: Option<usize>,
    pub draw_pending: u32,
    pub direction: Direction,
    pub last_status: Option<StepStatus>,
}

/// One episode of the card game: active players, top card, pending penalty
/// draws and turn order.
#[derive(Debug, Clone)]
pub struct Table {
    config: GameConfig,
    players: Vec<Player>,
    top_card: Card,
    draw_pending: u32,
    turn: usize,
    direction: Direction,
    last_status: Option<StepStatus>,
    rng: StdRng,
}

impl Table {
    /// Create a table with a fresh deal, seeded from the OS.
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a table with a fresh deal from a fixed seed.
    pub fn seeded(config: GameConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Self {
        let mut table = Table {
            config,
            players: Vec::new(),
            top_card: CARDS[0],
            draw_pending: 0,
            turn: 0,
            direction: Direction::Forward,
            last_status: None,
            rng,
        };
        table.reset();
        table
    }

    /// Build a table mid-game from explicit hands (seats are 0..hands.len()).
    /// Wild top cards must carry a resolved color.
    pub fn from_hands(
        config: GameConfig,
        hands: Vec<Hand>,
        top_card: Card,
        seed: u64,
    ) -> Result<Self, GameError> {
        if hands.is_empty() {
            return Err(GameError::InvalidSetup("at least one hand is required".into()));
        }
        if top_card.color().is_none() {
            return Err(GameError::InvalidSetup(format!(
                "top card {top_card} has no resolved color"
            )));
        }
        let players = hands
            .into_iter()
            .enumerate()
            .map(|(seat, hand)| Player::new(seat, hand))
            .collect();
        Ok(Table {
            config,
            players,
            top_card,
            draw_pending: 0,
            turn: 0,
            direction: Direction::Forward,
            last_status: None,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Length of every observation vector.
    pub fn state_size() -> usize {
        STATE_SIZE
    }

    /// Number of actions: one per card in the universe plus draw.
    pub fn action_count() -> usize {
        ACTION_COUNT
    }

    /// Start a new episode and return the first player's observation.
    pub fn reset(&mut self) -> Observation {
        let hand_size = self.config.initial_hand_size;
        self.players = (0..self.config.player_count)
            .map(|seat| Player::new(seat, Hand::deal(&mut self.rng, hand_size)))
            .collect();
        // The opening card is always colored so the first player has a color to match.
        self.top_card = CARDS[self.rng.random_range(0..NUM_CARDS - 2)];
        self.draw_pending = 0;
        self.turn = 0;
        self.direction = Direction::Forward;
        self.last_status = None;
        self.observation()
    }

    pub fn phase(&self) -> Phase {
        if self.players.len() <= 1 {
            Phase::Terminal
        } else {
            Phase::InProgress
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() == Phase::Terminal
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.turn)
    }

    pub fn top_card(&self) -> Card {
        self.top_card
    }

    pub fn draw_pending(&self) -> u32 {
        self.draw_pending
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether `player` (index into the active list) may take `action`.
    pub fn legal_move(&self, action: usize, player: usize) -> bool {
        if action == DRAW_ACTION {
            return true;
        }
        let Some(player) = self.players.get(player) else {
            return false;
        };
        if action >= NUM_CARDS || player.hand().count(action) == 0 {
            return false;
        }

        let card = CARDS[action];
        if self.draw_pending > 0 {
            // Only the same penalty rank can be stacked onto a pending draw.
            return card.rank().penalty().is_some() && card.rank() == self.top_card.rank();
        }
        if card.rank().is_wild() {
            return true;
        }
        card.color() == self.top_card.color() || card.rank() == self.top_card.rank()
    }

    /// Legal actions for the player holding the turn. Draw is always included.
    pub fn legal_actions(&self) -> Vec<usize> {
        (0..ACTION_COUNT)
            .filter(|&action| self.legal_move(action, self.turn))
            .collect()
    }

    /// Apply `action` for the player holding the turn.
    pub fn step(&mut self, action: usize) -> Result<StepResult, GameError> {
        if action >= ACTION_COUNT {
            return Err(GameError::InvalidAction {
                action,
                action_count: ACTION_COUNT,
            });
        }
        if self.is_terminal() {
            return Err(GameError::EpisodeOver);
        }

        let acting = self.turn;
        let actor = self.players[acting].seat();
        let rewards = self.config.rewards;
        let mut extra_steps = 0;

        let (status, reward) = if !self.legal_move(action, acting) {
            (StepStatus::Eliminated, rewards.illegal_move)
        } else if action == DRAW_ACTION {
            let count = if self.draw_pending > 0 {
                std::mem::take(&mut self.draw_pending)
            } else {
                1
            };
            let hand = self.players[acting].hand_mut();
            hand.draw(&mut self.rng, count as usize);
            (StepStatus::Drew, rewards.draw_card)
        } else {
            self.players[acting].hand_mut().remove(action);
            let card = CARDS[action];

            match card.rank() {
                Rank::Reverse => self.direction = self.direction.reversed(),
                Rank::Skip => extra_steps = 1,
                _ => {}
            }
            if let Some(penalty) = card.rank().penalty() {
                let stacks = self.draw_pending > 0 && self.top_card.rank() == card.rank();
                self.draw_pending = if stacks {
                    self.draw_pending + penalty
                } else {
                    penalty
                };
            }
            self.top_card = if card.rank().is_wild() {
                card.with_color(self.choose_wild_color(acting))
            } else {
                card
            };

            if self.players[acting].hand().is_empty() {
                (StepStatus::Won, rewards.card_played + rewards.player_finished)
            } else {
                (StepStatus::Played, rewards.card_played)
            }
        };

        let leaves = matches!(status, StepStatus::Won | StepStatus::Eliminated);
        self.advance_turn(acting, 1 + extra_steps, leaves);
        self.last_status = Some(status);

        Ok(StepResult {
            observation: self.observation(),
            reward,
            terminal: self.is_terminal(),
            info: StepInfo {
                turn: self.turn,
                seat: self.current_player().map(Player::seat),
                actor,
                status,
            },
        })
    }

    /// Move the turn `steps` players on from `acting`, removing the actor
    /// first when they left the table.
    fn advance_turn(&mut self, acting: usize, steps: usize, remove_acting: bool) {
        let Some(successor) = self.successor(acting, steps, remove_acting) else {
            if remove_acting {
                self.players.remove(acting);
            }
            self.turn = 0;
            return;
        };
        let successor_seat = self.players[successor].seat();

        let mut turn = successor;
        if remove_acting {
            self.players.remove(acting);
            // Every index after the removed actor shifts down by one.
            if successor > acting {
                turn -= 1;
            }
        }

        debug_assert_eq!(
            self.players[turn].seat(),
            successor_seat,
            "turn must point at the successor chosen before removal"
        );
        self.turn = turn;
    }

    /// Index of the player `steps` positions from `from`, skipping `from`
    /// itself when it is about to leave. `None` if nobody would remain.
    fn successor(&self, from: usize, steps: usize, skip_from: bool) -> Option<usize> {
        let len = self.players.len();
        let remaining_players = if skip_from { len - 1 } else { len };
        if remaining_players == 0 {
            return None;
        }

        let mut index = from;
        let mut remaining = steps;
        while remaining > 0 {
            index = self.direction.next(index, len);
            if skip_from && index == from {
                continue;
            }
            remaining -= 1;
        }
        Some(index)
    }

    fn choose_wild_color(&mut self, player: usize) -> Color {
        if self.config.wild_color == WildColorPolicy::MostHeld {
            let mut per_color = [0u32; 4];
            for (card, count) in self.players[player].hand().cards() {
                if let Some(color) = card.color() {
                    per_color[color.index()] += count;
                }
            }
            let best = (0..per_color.len()).max_by_key(|&i| (per_color[i], std::cmp::Reverse(i)));
            if let Some(best) = best.filter(|&i| per_color[i] > 0) {
                return Color::ALL[best];
            }
        }
        Color::ALL[self.rng.random_range(0..Color::ALL.len())]
    }

    /// Observation for the player currently holding the turn.
    pub fn observation(&self) -> Observation {
        encode_observation(
            self.top_card,
            self.current_player().map(Player::hand),
            self.draw_pending,
        )
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            top_card: self.top_card,
            seats: self
                .players
                .iter()
                .map(|p| SeatView {
                    seat: p.seat(),
                    hand_size: p.hand().len(),
                    counts: p.hand().counts().to_vec(),
                })
                .collect(),
            turn_seat: self.current_player().map(Player::seat),
            draw_pending: self.draw_pending,
            direction: self.direction,
            last_status: self.last_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::Color::{Blue, Green, Red, Yellow};

    fn card(color: Color, rank: Rank) -> Card {
        Card::colored(color, rank)
    }

    fn table(hands: Vec<Vec<Card>>, top: Card) -> Table {
        let hands = hands.iter().map(|cards| Hand::from_cards(cards)).collect();
        Table::from_hands(GameConfig::default(), hands, top, 11).unwrap()
    }

    fn seats(table: &Table) -> Vec<usize> {
        table.players().iter().map(Player::seat).collect()
    }

    #[test]
    fn test_reset_deals_fresh_table() {
        let mut table = Table::seeded(GameConfig::default(), 3);
        let obs = table.reset();
        assert_eq!(obs.len(), Table::state_size());
        assert_eq!(table.players().len(), 4);
        assert!(table.players().iter().all(|p| p.hand().len() == 7));
        assert_eq!(table.turn(), 0);
        assert_eq!(table.direction(), Direction::Forward);
        assert_eq!(table.draw_pending(), 0);
        assert!(table.top_card().color().is_some());
        assert_eq!(table.phase(), Phase::InProgress);
    }

    #[test]
    fn test_sizing_queries() {
        assert_eq!(Table::action_count(), NUM_CARDS + 1);
        assert_eq!(Table::state_size(), 2 * Table::action_count() - 1);
    }

    #[test]
    fn test_draw_is_always_legal() {
        let t = table(vec![vec![], vec![card(Red, Rank::Number(1))]], card(Blue, Rank::Number(2)));
        assert!(t.legal_move(DRAW_ACTION, 0));
        assert!(t.legal_move(DRAW_ACTION, 1));
    }

    #[test]
    fn test_unheld_card_is_illegal() {
        let t = table(vec![vec![], vec![]], card(Red, Rank::Number(2)));
        assert!(!t.legal_move(card(Red, Rank::Number(5)).index(), 0));
    }

    #[test]
    fn test_color_or_rank_match() {
        let red5 = card(Red, Rank::Number(5));
        let blue7 = card(Blue, Rank::Number(7));
        let green5 = card(Green, Rank::Number(5));
        let t = table(vec![vec![red5, blue7, green5], vec![]], card(Red, Rank::Number(7)));
        assert!(t.legal_move(red5.index(), 0));
        assert!(t.legal_move(blue7.index(), 0));
        assert!(!t.legal_move(green5.index(), 0));
    }

    #[test]
    fn test_wild_ignores_color_and_rank() {
        let wild = Card::WILD;
        let mut t = table(vec![vec![wild, wild], vec![]], card(Red, Rank::Number(7)));
        assert!(t.legal_move(wild.index(), 0));

        let result = t.step(wild.index()).unwrap();
        assert_eq!(result.info.status, StepStatus::Played);
        assert_eq!(t.top_card().rank(), Rank::Wild);
        assert!(t.top_card().color().is_some());
    }

    #[test]
    fn test_pending_draw_restricts_to_same_penalty() {
        let red2 = card(Red, Rank::DrawTwo);
        let red3 = card(Red, Rank::Number(3));
        let wild4 = Card::WILD_DRAW_FOUR;
        let mut t = table(
            vec![vec![red2, red2], vec![card(Blue, Rank::DrawTwo), red3, wild4]],
            card(Red, Rank::Number(9)),
        );
        t.step(red2.index()).unwrap();
        assert_eq!(t.draw_pending(), 2);

        assert!(t.legal_move(card(Blue, Rank::DrawTwo).index(), 1));
        assert!(!t.legal_move(red3.index(), 1), "same color no longer counts");
        assert!(!t.legal_move(wild4.index(), 1), "+4 cannot stack onto +2");
        assert!(t.legal_move(DRAW_ACTION, 1));
    }

    #[test]
    fn test_draw_two_cannot_stack_on_draw_four() {
        let wild4 = Card::WILD_DRAW_FOUR;
        let mut t = table(
            vec![vec![wild4, wild4], vec![card(Red, Rank::DrawTwo), card(Blue, Rank::DrawTwo)]],
            card(Green, Rank::Number(1)),
        );
        t.step(wild4.index()).unwrap();
        assert_eq!(t.draw_pending(), 4);
        assert!(!t.legal_move(card(Red, Rank::DrawTwo).index(), 1));
        assert!(!t.legal_move(card(Blue, Rank::DrawTwo).index(), 1));
    }

    #[test]
    fn test_draw_four_stacks_by_four() {
        let wild4 = Card::WILD_DRAW_FOUR;
        let mut t = table(vec![vec![wild4, wild4], vec![wild4, wild4]], card(Green, Rank::Number(1)));
        t.step(wild4.index()).unwrap();
        assert_eq!(t.draw_pending(), 4);
        let result = t.step(wild4.index()).unwrap();
        assert_eq!(result.info.status, StepStatus::Played);
        assert_eq!(t.draw_pending(), 8);
    }

    #[test]
    fn test_stacked_draw_two_scenario() {
        let red_plus2 = card(Red, Rank::DrawTwo);
        let blue_plus2 = card(Blue, Rank::DrawTwo);
        let mut t = table(
            vec![
                vec![red_plus2, card(Red, Rank::Number(3))],
                vec![blue_plus2, card(Green, Rank::Number(5))],
            ],
            card(Red, Rank::Number(7)),
        );

        let r = t.step(red_plus2.index()).unwrap();
        assert_eq!(t.top_card(), red_plus2);
        assert_eq!(t.draw_pending(), 2);
        assert_eq!(r.info.status, StepStatus::Played);
        assert_eq!(r.info.seat, Some(1));
        assert_eq!(t.players()[0].hand().len(), 1);

        let r = t.step(blue_plus2.index()).unwrap();
        assert_eq!(t.draw_pending(), 4);
        assert_eq!(r.info.status, StepStatus::Played);
        assert_eq!(r.reward, 2.0);
        assert_eq!(t.players()[1].hand().len(), 1);
        assert_eq!(r.info.seat, Some(0));

        let r = t.step(DRAW_ACTION).unwrap();
        assert_eq!(r.info.status, StepStatus::Drew);
        assert_eq!(r.reward, -1.0);
        assert_eq!(t.draw_pending(), 0);
        assert_eq!(t.players()[0].hand().len(), 5);
        assert!(!r.terminal);
    }

    #[test]
    fn test_plain_draw_takes_one_card() {
        let mut t = table(vec![vec![], vec![card(Red, Rank::Number(1))]], card(Blue, Rank::Number(2)));
        let r = t.step(DRAW_ACTION).unwrap();
        assert_eq!(r.info.status, StepStatus::Drew);
        assert_eq!(t.players()[0].hand().len(), 1);
    }

    #[test]
    fn test_win_removes_player_and_ends_two_player_game() {
        let red3 = card(Red, Rank::Number(3));
        let mut t = table(vec![vec![red3], vec![card(Blue, Rank::Number(1))]], card(Red, Rank::Number(7)));
        let r = t.step(red3.index()).unwrap();
        assert_eq!(r.info.status, StepStatus::Won);
        assert_eq!(r.reward, 7.0);
        assert!(r.terminal);
        assert_eq!(seats(&t), vec![1]);
        assert_eq!(t.phase(), Phase::Terminal);
        assert_eq!(t.step(DRAW_ACTION).unwrap_err(), GameError::EpisodeOver);
    }

    #[test]
    fn test_win_in_three_player_game_passes_turn_forward() {
        let red3 = card(Red, Rank::Number(3));
        let blue1 = card(Blue, Rank::Number(1));
        let mut t = table(vec![vec![red3], vec![blue1], vec![blue1]], card(Red, Rank::Number(7)));
        let r = t.step(red3.index()).unwrap();
        assert!(!r.terminal);
        assert_eq!(seats(&t), vec![1, 2]);
        assert_eq!(r.info.seat, Some(1));
        assert_eq!(t.turn(), 0);
    }

    #[test]
    fn test_illegal_move_eliminates() {
        let blue5 = card(Blue, Rank::Number(5));
        let mut t = table(
            vec![vec![blue5, blue5], vec![blue5], vec![blue5]],
            card(Red, Rank::Number(7)),
        );
        let r = t.step(blue5.index()).unwrap();
        assert_eq!(r.info.status, StepStatus::Eliminated);
        assert_eq!(r.reward, GameConfig::default().rewards.illegal_move);
        assert_eq!(seats(&t), vec![1, 2]);
        assert_eq!(r.info.seat, Some(1));
        assert!(!r.terminal);
    }

    #[test]
    fn test_playing_unheld_card_eliminates() {
        let mut t = table(vec![vec![], vec![]], card(Red, Rank::Number(7)));
        let r = t.step(card(Red, Rank::Number(1)).index()).unwrap();
        assert_eq!(r.info.status, StepStatus::Eliminated);
        assert!(r.terminal);
    }

    #[test]
    fn test_skip_costs_next_player_their_turn() {
        let skip = card(Red, Rank::Skip);
        let filler = card(Blue, Rank::Number(1));
        let mut t = table(
            vec![vec![skip, filler], vec![filler], vec![filler]],
            card(Red, Rank::Number(7)),
        );
        let r = t.step(skip.index()).unwrap();
        assert_eq!(r.info.seat, Some(2));
    }

    #[test]
    fn test_skip_in_two_player_game_repeats_turn() {
        let skip = card(Red, Rank::Skip);
        let filler = card(Blue, Rank::Number(1));
        let mut t = table(vec![vec![skip, filler], vec![filler]], card(Red, Rank::Number(7)));
        let r = t.step(skip.index()).unwrap();
        assert_eq!(r.info.seat, Some(0));
    }

    #[test]
    fn test_reverse_flips_direction() {
        let reverse = card(Red, Rank::Reverse);
        let filler = card(Blue, Rank::Number(1));
        let mut t = table(
            vec![vec![reverse, filler], vec![filler], vec![filler]],
            card(Red, Rank::Number(7)),
        );
        let r = t.step(reverse.index()).unwrap();
        assert_eq!(t.direction(), Direction::Backward);
        assert_eq!(r.info.seat, Some(2));
    }

    #[test]
    fn test_removal_while_backward_keeps_successor() {
        let reverse = card(Red, Rank::Reverse);
        let red1 = card(Red, Rank::Number(1));
        let filler = card(Blue, Rank::Number(1));
        // Seat 0 reverses, seat 3 then wins moving backward; seat 2 must follow.
        let mut t = table(
            vec![vec![reverse, filler], vec![filler], vec![filler], vec![red1]],
            card(Red, Rank::Number(7)),
        );
        t.step(reverse.index()).unwrap();
        let r = t.step(red1.index()).unwrap();
        assert_eq!(r.info.status, StepStatus::Won);
        assert_eq!(seats(&t), vec![0, 1, 2]);
        assert_eq!(r.info.seat, Some(2));
    }

    #[test]
    fn test_winning_skip_at_wraparound_skips_correct_player() {
        let reverse = card(Red, Rank::Reverse);
        let skip = card(Red, Rank::Skip);
        let filler = card(Blue, Rank::Number(1));
        // Seat 0 reverses (turn -> seat 3), seat 3 plays a skip as its last card.
        // Moving backward from seat 3: seat 2 is skipped, seat 1 plays.
        let mut t = table(
            vec![vec![reverse, filler], vec![filler], vec![filler], vec![skip]],
            card(Red, Rank::Number(7)),
        );
        t.step(reverse.index()).unwrap();
        let r = t.step(skip.index()).unwrap();
        assert_eq!(r.info.status, StepStatus::Won);
        assert_eq!(r.info.seat, Some(1));
    }

    #[test]
    fn test_last_seat_wins_forward_wraps_to_first() {
        let red1 = card(Red, Rank::Number(1));
        let filler = card(Blue, Rank::Number(1));
        let mut t = table(
            vec![vec![filler, filler], vec![filler, filler], vec![red1]],
            card(Red, Rank::Number(7)),
        );
        t.step(DRAW_ACTION).unwrap();
        t.step(DRAW_ACTION).unwrap();
        let r = t.step(red1.index()).unwrap();
        assert_eq!(r.info.status, StepStatus::Won);
        assert_eq!(r.info.seat, Some(0));
        assert_eq!(t.turn(), 0);
    }

    #[test]
    fn test_observation_is_for_next_player() {
        let red1 = card(Red, Rank::Number(1));
        let yellow9 = card(Yellow, Rank::Number(9));
        let mut t = table(vec![vec![red1, red1], vec![yellow9]], card(Red, Rank::Number(7)));
        let r = t.step(red1.index()).unwrap();
        assert_eq!(r.observation.len(), STATE_SIZE);
        assert_eq!(r.observation[red1.index()], 1.0);
        assert_eq!(r.observation[NUM_CARDS + yellow9.index()], 1.0);
        assert_eq!(r.observation[NUM_CARDS + red1.index()], 0.0);
    }

    #[test]
    fn test_out_of_range_action_is_error() {
        let mut t = Table::seeded(GameConfig::default(), 5);
        let err = t.step(ACTION_COUNT).unwrap_err();
        assert!(matches!(err, GameError::InvalidAction { .. }));
    }

    #[test]
    fn test_most_held_wild_color() {
        let config = GameConfig {
            wild_color: WildColorPolicy::MostHeld,
            ..GameConfig::default()
        };
        let wild = Card::WILD;
        let green = card(Green, Rank::Number(2));
        let hands = vec![
            Hand::from_cards(&[wild, green, green, card(Red, Rank::Number(4))]),
            Hand::from_cards(&[green]),
        ];
        let mut t = Table::from_hands(config, hands, card(Blue, Rank::Number(3)), 0).unwrap();
        t.step(wild.index()).unwrap();
        assert_eq!(t.top_card().color(), Some(Green));
    }

    #[test]
    fn test_from_hands_rejects_unresolved_top() {
        let err = Table::from_hands(
            GameConfig::default(),
            vec![Hand::new(), Hand::new()],
            Card::WILD,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidSetup(_)));
    }

    #[test]
    fn test_snapshot_reports_seats() {
        let t = Table::seeded(GameConfig::default(), 9);
        let snap = t.snapshot();
        assert_eq!(snap.seats.len(), 4);
        assert_eq!(snap.turn_seat, Some(0));
        assert!(snap.seats.iter().all(|s| s.hand_size == 7));
        assert_eq!(snap.last_status, None);
    }

    #[test]
    fn test_random_legal_play_preserves_hand_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        for seed in 0..50 {
            let mut t = Table::seeded(GameConfig::default(), seed);
            let mut steps = 0;
            while !t.is_terminal() && steps < 500 {
                let legal = t.legal_actions();
                let action = legal[rng.random_range(0..legal.len())];
                let before = t.current_player().unwrap().hand().clone();
                let pending = t.draw_pending();
                let acting_seat = t.current_player().unwrap().seat();

                let r = t.step(action).unwrap();
                assert_ne!(r.info.status, StepStatus::Eliminated);

                if let Some(after) = t.players().iter().find(|p| p.seat() == acting_seat) {
                    let after = after.hand();
                    if action == DRAW_ACTION {
                        let expected = if pending > 0 { pending as usize } else { 1 };
                        assert_eq!(after.len(), before.len() + expected);
                        assert_eq!(t.draw_pending(), 0);
                    } else {
                        assert_eq!(after.count(action), before.count(action) - 1);
                        assert_eq!(after.len(), before.len() - 1);
                    }
                } else {
                    assert_eq!(r.info.status, StepStatus::Won);
                }
                steps += 1;
            }
        }
    }
}
