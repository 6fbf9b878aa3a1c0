//! Population bookkeeping: spawning, scoring, survivor selection and reproduction.
//!
//! A [`Population`] is the full roster of every agent ever created during a run.
//! Entries are never removed; reduction only flips their [`Status`] so lineage can
//! be traced back through deceased ancestors.
//!
//! # Generation Lifecycle
//!
//! 1. **Spawn** - [`Population::spawn`] creates fresh random agents
//! 2. **Score** - [`Population::apply_round`] folds one round of game records into
//!    the fitness counters
//! 3. **Reduce** - [`Population::reduce`] keeps the best alive agents by a
//!    [`SelectionCriterion`]
//! 4. **Reproduce** - [`Population::reproduce`] pairs survivors and adds one child
//!    per survivor
//!
//! # Scoring
//!
//! | Outcome | Winner          | Loser    | Each side on a tie |
//! |---------|-----------------|----------|--------------------|
//! | Points  | +3 score, +1 win | +1 loss | +1 score           |
//!
//! Every participant's play counter goes up once per game.

use std::{cmp::Ordering, fmt};

use fourfold_agent::{Agent, AgentError, AgentShape, weights::MutationParams};
use rand::{Rng, seq::SliceRandom as _};
use serde::{Deserialize, Serialize};

use crate::{names::NamePool, tournament::TournamentRecord};

const WIN_POINTS: u32 = 3;
const TIE_POINTS: u32 = 1;

/// Identifier of a population entry.
///
/// Ids are assigned sequentially from zero and double as the entry's index in the
/// roster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(u32);

impl AgentId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:05}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
pub enum Status {
    Alive,
    Deceased,
}

/// Where an agent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lineage {
    /// Created with random weights.
    Spawned,
    /// Child of a survivor paired with itself.
    Cloned { parent: AgentId },
    /// Child of two distinct survivors.
    Crossed { first: AgentId, second: AgentId },
}

impl Lineage {
    /// Returns the parents, zero, one or two of them.
    pub fn parents(self) -> impl Iterator<Item = AgentId> {
        let (first, second) = match self {
            Lineage::Spawned => (None, None),
            Lineage::Cloned { parent } => (Some(parent), None),
            Lineage::Crossed { first, second } => (Some(first), Some(second)),
        };
        first.into_iter().chain(second)
    }
}

/// Fitness counters of one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fitness {
    pub score: u32,
    pub max_score: u32,
    pub wins: u32,
    pub losses: u32,
    pub plays: u32,
}

impl Fitness {
    /// Wins divided by losses; infinite when the agent has never lost.
    #[must_use]
    pub fn win_loss_ratio(&self) -> f64 {
        if self.losses == 0 {
            f64::INFINITY
        } else {
            f64::from(self.wins) / f64::from(self.losses)
        }
    }

    fn add_score(&mut self, points: u32) {
        self.score += points;
        self.max_score = self.max_score.max(self.score);
    }

    fn reset_round(&mut self) {
        self.score = 0;
        self.wins = 0;
        self.losses = 0;
    }
}

/// One agent in the roster together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationEntry {
    id: AgentId,
    name: String,
    generation: u32,
    lineage: Lineage,
    status: Status,
    fitness: Fitness,
    agent: Agent,
}

impl PopulationEntry {
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub fn lineage(&self) -> Lineage {
        self.lineage
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    #[must_use]
    pub fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

/// Ranking key used by [`Population::reduce`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum SelectionCriterion {
    /// Highest cumulative score first.
    #[default]
    Score,
    /// Youngest generation first.
    Generation,
    /// Highest win/loss ratio first.
    WinLossRatio,
}

impl SelectionCriterion {
    /// Orders entries best first; equal keys fall back to the lowest id.
    fn compare(self, a: &PopulationEntry, b: &PopulationEntry) -> Ordering {
        let by_key = match self {
            SelectionCriterion::Score => b.fitness.score.cmp(&a.fitness.score),
            SelectionCriterion::Generation => b.generation.cmp(&a.generation),
            SelectionCriterion::WinLossRatio => b
                .fitness
                .win_loss_ratio()
                .total_cmp(&a.fitness.win_loss_ratio()),
        };
        by_key.then(a.id.cmp(&b.id))
    }
}

/// Whether fitness counters carry over from one round to the next.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Score, wins and losses keep accumulating over an agent's lifetime.
    #[default]
    Accumulate,
    /// Score, wins and losses restart from zero before each round is scored.
    ResetEachRound,
}

/// The roster of every agent created during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    entries: Vec<PopulationEntry>,
}

impl Population {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a population from entries whose ids equal their positions.
    pub(crate) fn from_entries_unchecked(entries: Vec<PopulationEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[PopulationEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, id: AgentId) -> Option<&PopulationEntry> {
        self.entries.get(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn alive(&self) -> impl Iterator<Item = &PopulationEntry> {
        self.entries.iter().filter(|entry| entry.is_alive())
    }

    #[must_use]
    pub fn alive_ids(&self) -> Vec<AgentId> {
        self.alive().map(PopulationEntry::id).collect()
    }

    /// Highest generation number in the roster, `0` when empty.
    #[must_use]
    pub fn max_generation(&self) -> u32 {
        self.entries
            .iter()
            .map(PopulationEntry::generation)
            .max()
            .unwrap_or(0)
    }

    fn next_id(&self) -> AgentId {
        let id = u32::try_from(self.entries.len()).expect("population exceeds u32::MAX entries");
        AgentId(id)
    }

    pub(crate) fn push(
        &mut self,
        generation: u32,
        lineage: Lineage,
        agent: Agent,
        names: &NamePool,
        rng: &mut (impl Rng + ?Sized),
    ) -> AgentId {
        let id = self.next_id();
        self.entries.push(PopulationEntry {
            id,
            name: names.name_for(id, rng),
            generation,
            lineage,
            status: Status::Alive,
            fitness: Fitness::default(),
            agent,
        });
        id
    }

    /// Adds `count` alive agents with random weights.
    pub fn spawn<R>(
        &mut self,
        count: usize,
        generation: u32,
        shape: AgentShape,
        names: &NamePool,
        rng: &mut R,
    ) -> Vec<AgentId>
    where
        R: Rng + ?Sized,
    {
        (0..count)
            .map(|_| {
                let agent = Agent::random(shape, rng);
                self.push(generation, Lineage::Spawned, agent, names, rng)
            })
            .collect()
    }

    /// Folds one round of game records into the fitness counters.
    ///
    /// Records naming unknown agents are ignored.
    pub fn apply_round(&mut self, records: &[TournamentRecord], policy: ScorePolicy) {
        if policy == ScorePolicy::ResetEachRound {
            for record in records {
                for id in [record.first, record.second] {
                    if let Some(entry) = self.entries.get_mut(id.index()) {
                        entry.fitness.reset_round();
                    }
                }
            }
        }

        for record in records {
            for id in [record.first, record.second] {
                if let Some(entry) = self.entries.get_mut(id.index()) {
                    entry.fitness.plays += 1;
                }
            }
            match record.winner {
                Some(winner) => {
                    let loser = if winner == record.first {
                        record.second
                    } else {
                        record.first
                    };
                    if let Some(entry) = self.entries.get_mut(winner.index()) {
                        entry.fitness.add_score(WIN_POINTS);
                        entry.fitness.wins += 1;
                    }
                    if let Some(entry) = self.entries.get_mut(loser.index()) {
                        entry.fitness.losses += 1;
                    }
                }
                None => {
                    for id in [record.first, record.second] {
                        if let Some(entry) = self.entries.get_mut(id.index()) {
                            entry.fitness.add_score(TIE_POINTS);
                        }
                    }
                }
            }
        }
    }

    /// Every entry, deceased included, best first by `criterion`.
    #[must_use]
    pub fn ranking(&self, criterion: SelectionCriterion) -> Vec<&PopulationEntry> {
        let mut ranked = self.entries.iter().collect::<Vec<_>>();
        ranked.sort_by(|a, b| criterion.compare(a, b));
        ranked
    }

    /// Keeps the best `survivor_count` alive agents and marks everyone else deceased.
    ///
    /// Only currently alive agents compete; ties are broken by lowest id. Returns
    /// the survivors best first.
    pub fn reduce(&mut self, survivor_count: usize, criterion: SelectionCriterion) -> Vec<AgentId> {
        let mut ranked = self.alive().collect::<Vec<_>>();
        ranked.sort_by(|a, b| criterion.compare(a, b));
        let survivors = ranked
            .into_iter()
            .take(survivor_count)
            .map(PopulationEntry::id)
            .collect::<Vec<_>>();

        for entry in &mut self.entries {
            entry.status = Status::Deceased;
        }
        for id in &survivors {
            self.entries[id.index()].status = Status::Alive;
        }
        survivors
    }

    /// Breeds one child per alive agent.
    ///
    /// Survivors are shuffled and each one is paired with its predecessor, wrapping
    /// around, so every survivor is a parent of two children. Each child is the
    /// crossover of its parents followed by mutation, belongs to the generation
    /// after the current maximum and starts with zeroed fitness.
    ///
    /// A lone survivor is paired with itself and its child is recorded as a clone.
    /// On error no child is added.
    pub fn reproduce<R>(
        &mut self,
        mutation: MutationParams,
        names: &NamePool,
        rng: &mut R,
    ) -> Result<Vec<AgentId>, AgentError>
    where
        R: Rng + ?Sized,
    {
        let mut parents = self.alive_ids();
        parents.shuffle(rng);
        let generation = self.max_generation() + 1;

        let mut children = Vec::with_capacity(parents.len());
        for (i, &second) in parents.iter().enumerate() {
            let first = parents[(i + parents.len() - 1) % parents.len()];
            let lineage = if first == second {
                log::warn!("survivor {first} is paired with itself; its child is a mutated clone");
                Lineage::Cloned { parent: first }
            } else {
                Lineage::Crossed { first, second }
            };
            let mut child = self.entries[first.index()]
                .agent
                .cross(&self.entries[second.index()].agent, rng)?;
            child.mutate(mutation, rng);
            children.push((lineage, child));
        }

        Ok(children
            .into_iter()
            .map(|(lineage, child)| self.push(generation, lineage, child, names, rng))
            .collect())
    }
}
