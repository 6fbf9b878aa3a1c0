//! Round-robin self-play.
//!
//! A round pairs every alive agent with every other alive agent twice, once as
//! the first mover and once as the second. Games are deterministic: the same two
//! agents on the same board always produce the same outcome, so a round can be
//! split across worker threads without changing its result.

use std::thread;

use chrono::{DateTime, Utc};
use fourfold_agent::{Agent, AgentError};
use fourfold_engine::{Board, BoardSize, GameStatus, Player};
use serde::{Deserialize, Serialize};

use crate::{
    encoding::encode,
    evolution::CancelToken,
    policy::{self, NoLegalMove},
    population::{AgentId, Population, PopulationEntry},
};

/// One scheduled game: `first` plays as player A and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub first: AgentId,
    pub second: AgentId,
}

/// Builds every ordered pairing of distinct agents.
///
/// The result has `k * (k - 1)` entries for `k` agents, ordered by first mover,
/// then by second mover, both in the order given.
///
/// ```
/// use fourfold_training::{population::AgentId, tournament::schedule_round};
///
/// let ids = [AgentId::new(0), AgentId::new(1), AgentId::new(2)];
/// let pairings = schedule_round(&ids);
/// assert_eq!(pairings.len(), 6);
/// assert_eq!((pairings[0].first, pairings[0].second), (ids[0], ids[1]));
/// assert_eq!((pairings[5].first, pairings[5].second), (ids[2], ids[1]));
/// ```
#[must_use]
pub fn schedule_round(agents: &[AgentId]) -> Vec<Pairing> {
    agents
        .iter()
        .flat_map(|&first| {
            agents
                .iter()
                .filter(move |&&second| second != first)
                .map(move |&second| Pairing { first, second })
        })
        .collect()
}

/// Final state of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub status: GameStatus,
    pub move_count: usize,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum GameError {
    #[display("agent evaluation failed: {_0}")]
    Agent(AgentError),
    #[display("{_0}")]
    NoLegalMove(NoLegalMove),
    #[display("agent produced {actual} column scores for a board with {expected} columns")]
    #[from(ignore)]
    OutputMismatch { expected: usize, actual: usize },
    #[display("agent {id} is not in the population")]
    #[from(ignore)]
    UnknownAgent { id: AgentId },
}

/// Plays one game on an empty board of `size` and returns how it ended.
///
/// `first` plays as player A. Each turn the acting agent sees the board from its
/// own perspective and the best-scored open column is played.
pub fn play_game(size: BoardSize, first: &Agent, second: &Agent) -> Result<GameOutcome, GameError> {
    let mut board = Board::new(size);
    let mut player = Player::A;
    let mut status = GameStatus::InProgress;

    while !status.is_terminal() {
        let agent = match player {
            Player::A => first,
            Player::B => second,
        };
        let scores = agent.forward(&encode(&board, player))?;
        if scores.len() != board.columns() {
            return Err(GameError::OutputMismatch {
                expected: board.columns(),
                actual: scores.len(),
            });
        }
        policy::select_and_apply(&mut board, &scores, player)?;
        status = board.check_terminal();
        player = player.opponent();
    }

    Ok(GameOutcome {
        status,
        move_count: board.move_count(),
    })
}

/// One row of the tournament history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub round: u32,
    pub first: AgentId,
    pub second: AgentId,
    pub first_name: String,
    pub second_name: String,
    pub played_at: DateTime<Utc>,
    /// `None` for a tie.
    pub winner: Option<AgentId>,
    pub move_count: usize,
}

impl TournamentRecord {
    #[must_use]
    pub fn is_tie(&self) -> bool {
        self.winner.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum RoundError {
    #[display("game {first} vs {second} failed: {source}")]
    Game {
        first: AgentId,
        second: AgentId,
        source: GameError,
    },
    #[display("round cancelled")]
    Cancelled,
}

fn lookup(population: &Population, id: AgentId) -> Result<&PopulationEntry, GameError> {
    population.entry(id).ok_or(GameError::UnknownAgent { id })
}

fn play_pairing(
    population: &Population,
    size: BoardSize,
    round: u32,
    pairing: Pairing,
) -> Result<TournamentRecord, GameError> {
    let first = lookup(population, pairing.first)?;
    let second = lookup(population, pairing.second)?;
    let outcome = play_game(size, first.agent(), second.agent())?;
    let winner = outcome.status.winner().map(|player| match player {
        Player::A => first.id(),
        Player::B => second.id(),
    });
    log::debug!(
        "round {round}: {} vs {} -> {} after {} moves",
        first.name(),
        second.name(),
        winner.map_or_else(|| "tie".to_owned(), |id| format!("{id} wins")),
        outcome.move_count
    );
    Ok(TournamentRecord {
        round,
        first: first.id(),
        second: second.id(),
        first_name: first.name().to_owned(),
        second_name: second.name().to_owned(),
        played_at: Utc::now(),
        winner,
        move_count: outcome.move_count,
    })
}

fn play_chunk(
    population: &Population,
    size: BoardSize,
    round: u32,
    pairings: &[Pairing],
    cancel: &CancelToken,
) -> Result<Vec<TournamentRecord>, RoundError> {
    pairings
        .iter()
        .map(|&pairing| {
            if cancel.is_cancelled() {
                return Err(RoundError::Cancelled);
            }
            play_pairing(population, size, round, pairing).map_err(|source| RoundError::Game {
                first: pairing.first,
                second: pairing.second,
                source,
            })
        })
        .collect()
}

/// Plays every pairing of the alive agents and returns the records in pairing
/// order.
///
/// With `threads > 1` the pairings are split into contiguous chunks played on
/// scoped worker threads. Cancellation is checked before every game; a cancelled
/// round returns no records.
pub fn play_round(
    population: &Population,
    size: BoardSize,
    round: u32,
    threads: usize,
    cancel: &CancelToken,
) -> Result<Vec<TournamentRecord>, RoundError> {
    let pairings = schedule_round(&population.alive_ids());
    if threads <= 1 || pairings.len() <= 1 {
        return play_chunk(population, size, round, &pairings, cancel);
    }

    let chunk_size = pairings.len().div_ceil(threads);
    let results = thread::scope(|s| {
        let handles = pairings
            .chunks(chunk_size)
            .map(|chunk| s.spawn(move || play_chunk(population, size, round, chunk, cancel)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect::<Vec<_>>()
    });

    let mut records = Vec::with_capacity(pairings.len());
    for result in results {
        records.extend(result?);
    }
    Ok(records)
}
