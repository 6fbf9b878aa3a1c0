//! Generation loop.
//!
//! [`EvolutionDriver`] owns the population, the tournament history and the run's
//! RNG. Each [`EvolutionDriver::step`] works on copies of all three and commits
//! them only once the generation has completed, so a cancelled or failed
//! generation leaves the driver exactly as it was after the previous one.

#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use fourfold_agent::{AgentError, AgentShape};
use fourfold_engine::BoardSize;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    config::{ConfigError, EvolutionConfig},
    names::NamePool,
    population::{AgentId, Population},
    tournament::{self, GameError, RoundError, TournamentRecord},
};

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one clone can be handed to whatever watches
/// for a stop request while the driver polls another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    /// Checks left before the token cancels itself.
    #[cfg(test)]
    trip_after: Option<Arc<AtomicUsize>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that cancels itself on check number `checks + 1`.
    #[cfg(test)]
    pub(crate) fn tripping_after(checks: usize) -> Self {
        Self {
            trip_after: Some(Arc::new(AtomicUsize::new(checks))),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        #[cfg(test)]
        if let Some(remaining) = &self.trip_after {
            let tripped = remaining
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                .is_err();
            if tripped {
                self.cancel();
            }
        }
        self.flag.load(Ordering::Relaxed)
    }
}

/// Append-only log of every game played during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<TournamentRecord>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> &[TournamentRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of the most recent round, `0` before any game.
    #[must_use]
    pub fn last_round(&self) -> u32 {
        self.records.last().map_or(0, |record| record.round)
    }

    pub fn round(&self, round: u32) -> impl Iterator<Item = &TournamentRecord> {
        self.records.iter().filter(move |record| record.round == round)
    }

    fn extend(&mut self, records: Vec<TournamentRecord>) {
        self.records.extend(records);
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum EvolutionError {
    #[display("{_0}")]
    Config(ConfigError),
    #[display("game {first} vs {second} failed: {source}")]
    Game {
        first: AgentId,
        second: AgentId,
        source: GameError,
    },
    #[display("reproduction failed: {_0}")]
    Agent(AgentError),
    #[display("roster agents have shape {actual}, but the configuration requires {expected}")]
    ShapeMismatch {
        expected: AgentShape,
        actual: AgentShape,
    },
    #[display("evolution cancelled")]
    Cancelled,
}

impl From<ConfigError> for EvolutionError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<AgentError> for EvolutionError {
    fn from(err: AgentError) -> Self {
        Self::Agent(err)
    }
}

impl From<RoundError> for EvolutionError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::Game {
                first,
                second,
                source,
            } => Self::Game {
                first,
                second,
                source,
            },
            RoundError::Cancelled => Self::Cancelled,
        }
    }
}

/// Statistics of one completed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub round: u32,
    /// Newest generation that took part in the round.
    pub generation: u32,
    pub games: usize,
    pub ties: usize,
    pub min_score: u32,
    pub max_score: u32,
    pub mean_score: f64,
    /// Best survivor by the configured selection criterion.
    pub best: Option<(AgentId, String)>,
    pub survivors: Vec<AgentId>,
    pub offspring: Vec<AgentId>,
}

impl fmt::Display for GenerationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {} (generation {}): {} games, {} ties, score min/mean/max {}/{:.2}/{}",
            self.round,
            self.generation,
            self.games,
            self.ties,
            self.min_score,
            self.mean_score,
            self.max_score
        )?;
        if let Some((_, name)) = &self.best {
            write!(f, ", best {name}")?;
        }
        Ok(())
    }
}

/// Outcome of [`EvolutionDriver::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub summaries: Vec<GenerationSummary>,
    /// `true` when the run stopped early on a cancel request.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct EvolutionDriver {
    config: EvolutionConfig,
    size: BoardSize,
    names: NamePool,
    population: Population,
    history: History,
    rng: Pcg32,
}

impl EvolutionDriver {
    /// Starts a run with `2 * population` freshly spawned generation-1 agents.
    pub fn new(config: EvolutionConfig, names: NamePool) -> Result<Self, EvolutionError> {
        Self::resume(config, names, Population::new(), History::new())
    }

    /// Continues a run from a saved population and history.
    ///
    /// An empty population is seeded as in [`EvolutionDriver::new`]. Otherwise the
    /// population's agents must match the configured board and hidden size.
    pub fn resume(
        config: EvolutionConfig,
        names: NamePool,
        mut population: Population,
        history: History,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        let size = config.board_size()?;
        let shape = config.agent_shape()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!("evolution seed: {seed}");
        let mut rng = Pcg32::seed_from_u64(seed);

        if let Some(entry) = population.entries().first() {
            let actual = *entry.agent().shape();
            if actual != shape {
                return Err(EvolutionError::ShapeMismatch {
                    expected: shape,
                    actual,
                });
            }
        } else {
            population.spawn(2 * config.population, 1, shape, &names, &mut rng);
            log::info!("spawned {} agents ({shape})", population.len());
        }

        Ok(Self {
            config,
            size,
            names,
            population,
            history,
            rng,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn into_parts(self) -> (Population, History) {
        (self.population, self.history)
    }

    /// Plays one round, scores it, keeps the best agents and breeds the next
    /// generation.
    ///
    /// Nothing is committed unless the whole generation succeeds; on
    /// [`EvolutionError::Cancelled`] or any other error the population, history
    /// and RNG keep their previous state.
    pub fn step(&mut self, cancel: &CancelToken) -> Result<GenerationSummary, EvolutionError> {
        if cancel.is_cancelled() {
            return Err(EvolutionError::Cancelled);
        }

        let mut population = self.population.clone();
        let mut rng = self.rng.clone();
        let round = self.history.last_round() + 1;
        let generation = population.max_generation();

        let records = tournament::play_round(
            &population,
            self.size,
            round,
            self.config.threads,
            cancel,
        )?;
        population.apply_round(&records, self.config.score_policy);

        let scores = population
            .alive()
            .map(|entry| entry.fitness().score)
            .collect::<Vec<_>>();
        let survivors = population.reduce(self.config.population, self.config.selection);
        let offspring = population.reproduce(self.config.mutation, &self.names, &mut rng)?;

        let best = survivors.first().and_then(|&id| {
            population
                .entry(id)
                .map(|entry| (id, entry.name().to_owned()))
        });
        #[expect(clippy::cast_precision_loss)]
        let mean_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
        };
        let summary = GenerationSummary {
            round,
            generation,
            games: records.len(),
            ties: records.iter().filter(|r| r.is_tie()).count(),
            min_score: scores.iter().copied().min().unwrap_or(0),
            max_score: scores.iter().copied().max().unwrap_or(0),
            mean_score,
            best,
            survivors,
            offspring,
        };

        self.population = population;
        self.history.extend(records);
        self.rng = rng;

        log::info!("{summary}");
        Ok(summary)
    }

    /// Runs up to `generations` steps.
    ///
    /// A cancel request ends the run early with the last completed generation
    /// committed and `cancelled` set in the report. Other errors are returned.
    pub fn run(&mut self, generations: u32, cancel: &CancelToken) -> Result<RunReport, EvolutionError> {
        let mut summaries = Vec::new();
        for _ in 0..generations {
            match self.step(cancel) {
                Ok(summary) => summaries.push(summary),
                Err(EvolutionError::Cancelled) => {
                    log::warn!(
                        "cancelled after {} completed generation(s); keeping the last committed state",
                        summaries.len()
                    );
                    return Ok(RunReport {
                        summaries,
                        cancelled: true,
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(RunReport {
            summaries,
            cancelled: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::SelectionCriterion;

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population: 2,
            rows: 4,
            columns: 5,
            hidden: 3,
            seed: Some(42),
            ..EvolutionConfig::default()
        }
    }

    fn driver(config: EvolutionConfig) -> EvolutionDriver {
        EvolutionDriver::new(config, NamePool::default()).unwrap()
    }

    #[test]
    fn test_new_spawns_first_generation() {
        let driver = driver(small_config());
        let population = driver.population();
        assert_eq!(population.len(), 4);
        assert_eq!(population.alive().count(), 4);
        assert_eq!(population.max_generation(), 1);
        assert!(driver.history().is_empty());
    }

    #[test]
    fn test_step_commits_one_generation() {
        let mut driver = driver(small_config());
        let summary = driver.step(&CancelToken::new()).unwrap();

        assert_eq!(summary.round, 1);
        assert_eq!(summary.generation, 1);
        assert_eq!(summary.games, 4 * 3);
        assert_eq!(summary.survivors.len(), 2);
        assert_eq!(summary.offspring.len(), 2);
        assert_eq!(summary.best.as_ref().map(|(id, _)| *id), summary.survivors.first().copied());

        let population = driver.population();
        assert_eq!(population.len(), 6);
        assert_eq!(population.alive().count(), 4);
        assert_eq!(population.max_generation(), 2);
        assert_eq!(driver.history().len(), 12);
        assert_eq!(driver.history().last_round(), 1);
        assert_eq!(driver.history().round(1).count(), 12);
    }

    #[test]
    fn test_run_is_reproducible_across_thread_counts() {
        let mut sequential = driver(small_config());
        let mut parallel = driver(EvolutionConfig {
            threads: 3,
            ..small_config()
        });
        let cancel = CancelToken::new();
        sequential.run(3, &cancel).unwrap();
        parallel.run(3, &cancel).unwrap();

        assert_eq!(sequential.population(), parallel.population());
        let key = |r: &TournamentRecord| (r.round, r.first, r.second, r.winner, r.move_count);
        assert_eq!(
            sequential.history().records().iter().map(key).collect::<Vec<_>>(),
            parallel.history().records().iter().map(key).collect::<Vec<_>>()
        );
        assert_eq!(sequential.history().last_round(), 3);
        assert_eq!(sequential.population().max_generation(), 4);
    }

    #[test]
    fn test_cancel_keeps_last_committed_state() {
        let mut driver = driver(small_config());
        let cancel = CancelToken::new();
        driver.step(&cancel).unwrap();
        let population = driver.population().clone();
        let history = driver.history().clone();

        cancel.cancel();
        assert!(driver.step(&cancel).unwrap_err().is_cancelled());
        assert_eq!(driver.population(), &population);
        assert_eq!(driver.history(), &history);

        let report = driver.run(5, &cancel).unwrap();
        assert!(report.cancelled);
        assert!(report.summaries.is_empty());
        assert_eq!(driver.population(), &population);
    }

    #[test]
    fn test_cancel_mid_round_discards_partial_games() {
        for threads in [1, 3] {
            let config = EvolutionConfig {
                threads,
                ..small_config()
            };
            let mut driver = driver(config);
            driver.step(&CancelToken::new()).unwrap();
            let committed = driver.clone();

            // One check before the round, then four games before the stop lands.
            let cancel = CancelToken::tripping_after(5);
            assert!(driver.step(&cancel).unwrap_err().is_cancelled());
            assert!(cancel.is_cancelled());
            assert_eq!(driver.population(), committed.population());
            assert_eq!(driver.history(), committed.history());
            assert_eq!(driver.history().last_round(), 1);

            // The RNG was not advanced either: the next generation matches an
            // uninterrupted driver exactly.
            let mut control = committed;
            let resumed = driver.step(&CancelToken::new()).unwrap();
            let expected = control.step(&CancelToken::new()).unwrap();
            assert_eq!(resumed, expected);
            assert_eq!(driver.population(), control.population());
        }
    }

    #[test]
    fn test_resume_continues_rounds() {
        let mut first = driver(small_config());
        first.run(2, &CancelToken::new()).unwrap();
        let (population, history) = first.into_parts();

        let mut resumed =
            EvolutionDriver::resume(small_config(), NamePool::default(), population, history)
                .unwrap();
        let summary = resumed.step(&CancelToken::new()).unwrap();
        assert_eq!(summary.round, 3);
        assert_eq!(summary.generation, 3);
        assert_eq!(resumed.history().last_round(), 3);
    }

    #[test]
    fn test_resume_rejects_other_shapes() {
        let first = driver(small_config());
        let (population, history) = first.into_parts();
        let config = EvolutionConfig {
            hidden: 5,
            ..small_config()
        };
        let err = EvolutionDriver::resume(config, NamePool::default(), population, history)
            .unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_generation_selection_prefers_offspring() {
        let mut driver = driver(EvolutionConfig {
            selection: SelectionCriterion::Generation,
            ..small_config()
        });
        let cancel = CancelToken::new();
        driver.step(&cancel).unwrap();
        let summary = driver.step(&cancel).unwrap();
        let population = driver.population();
        for id in summary.survivors {
            assert_eq!(population.entry(id).unwrap().generation(), 2);
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EvolutionConfig {
            population: 0,
            ..small_config()
        };
        let err = EvolutionDriver::new(config, NamePool::default()).unwrap_err();
        assert!(err.is_config());
    }
}
