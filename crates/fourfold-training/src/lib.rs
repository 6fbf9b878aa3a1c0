//! Evolutionary self-play training for Connect Four agents.
//!
//! This crate is where boards and agents meet. It encodes boards for the
//! networks, turns network scores into moves, runs round-robin tournaments and
//! evolves a population of agents with selection, crossover and mutation.
//!
//! # Modules
//!
//! - [`encoding`] - Board to network input
//! - [`policy`] - Greedy column selection with fallback for full columns
//! - [`tournament`] - Single games, round scheduling and parallel rounds
//! - [`population`] - Roster bookkeeping, scoring, reduction and reproduction
//! - [`evolution`] - The cancellable generation loop
//! - [`roster`] - Validated persistence format for a population
//! - [`config`] - Run parameters
//! - [`names`] - Agent name pool
//!
//! # Example
//!
//! ```
//! use fourfold_training::{
//!     config::EvolutionConfig,
//!     evolution::{CancelToken, EvolutionDriver},
//!     names::NamePool,
//! };
//!
//! let config = EvolutionConfig {
//!     population: 2,
//!     seed: Some(1),
//!     ..EvolutionConfig::default()
//! };
//! let mut driver = EvolutionDriver::new(config, NamePool::default()).unwrap();
//! let report = driver.run(2, &CancelToken::new()).unwrap();
//!
//! assert_eq!(report.summaries.len(), 2);
//! assert_eq!(driver.population().alive().count(), 4);
//! ```

pub mod config;
pub mod encoding;
pub mod evolution;
pub mod names;
pub mod policy;
pub mod population;
pub mod roster;
pub mod tournament;
