use crate::ai::{Agent, SafeAgent};
use crate::error::TrainingError;
use crate::game::{GameConfig, Player, StepStatus, Table};

/// Steps after which an evaluation game is abandoned.
const MAX_EVAL_STEPS: usize = 10_000;

/// How a single evaluation game ended for the evaluated agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// The agent emptied its hand before any opponent.
    Won,
    /// An opponent emptied its hand first.
    Lost,
    /// The agent attempted an illegal move.
    Eliminated,
    /// Nobody finished within the step limit.
    Unfinished,
}

/// Aggregate results of [`evaluate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub games: usize,
    pub wins: usize,
    pub eliminations: usize,
    pub unfinished: usize,
    pub average_length: f32,
}

impl EvaluationReport {
    pub fn win_rate(&self) -> f32 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins as f32 / self.games as f32
    }

    pub fn elimination_rate(&self) -> f32 {
        if self.games == 0 {
            return 0.0;
        }
        self.eliminations as f32 / self.games as f32
    }
}

/// Play one game with `agent` at `agent_seat` and `opponent` at every other
/// seat. The game ends as soon as anyone finishes or the agent is eliminated.
pub fn play_eval_game(
    table: &mut Table,
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    agent_seat: usize,
) -> Result<(GameOutcome, usize), TrainingError> {
    table.reset();
    let mut steps = 0;

    while !table.is_terminal() && steps < MAX_EVAL_STEPS {
        let is_agent_turn = table.current_player().map(Player::seat) == Some(agent_seat);
        let action = if is_agent_turn {
            agent.select_action(table)?
        } else {
            opponent.select_action(table)?
        };
        let result = table.step(action)?;
        steps += 1;

        let by_agent = result.info.actor == agent_seat;
        match (result.info.status, by_agent) {
            (StepStatus::Won, true) => return Ok((GameOutcome::Won, steps)),
            (StepStatus::Won, false) => return Ok((GameOutcome::Lost, steps)),
            (StepStatus::Eliminated, true) => return Ok((GameOutcome::Eliminated, steps)),
            _ => {}
        }
    }

    // Only reachable when opponents eliminate each other down to the agent.
    if table.is_terminal() {
        return Ok((GameOutcome::Won, steps));
    }
    Ok((GameOutcome::Unfinished, steps))
}

/// Evaluate `agent` against safe bots over `games` games, rotating its seat.
/// Tables are seeded from `seed` so runs are reproducible.
pub fn evaluate(
    agent: &mut dyn Agent,
    game: &GameConfig,
    games: usize,
    seed: u64,
) -> Result<EvaluationReport, TrainingError> {
    let mut opponent = SafeAgent::seeded(episode_seed(seed, usize::MAX));
    let mut report = EvaluationReport {
        games,
        ..EvaluationReport::default()
    };
    let mut total_length = 0;

    for game_idx in 0..games {
        let mut table = Table::seeded(game.clone(), episode_seed(seed, game_idx));
        let agent_seat = game_idx % game.player_count;
        let (outcome, length) = play_eval_game(&mut table, agent, &mut opponent, agent_seat)?;
        total_length += length;
        match outcome {
            GameOutcome::Won => report.wins += 1,
            GameOutcome::Eliminated => report.eliminations += 1,
            GameOutcome::Unfinished => report.unfinished += 1,
            GameOutcome::Lost => {}
        }
    }

    if games > 0 {
        report.average_length = total_length as f32 / games as f32;
    }
    Ok(report)
}

/// Derive a deterministic seed for a given episode index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}
