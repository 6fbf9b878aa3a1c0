//! Persisted form of a [`Population`].
//!
//! A roster is a plain serde document. Tensor lengths are checked while the
//! agents are deserialized; [`Roster::into_population`] checks everything that
//! spans several entries and refuses to drop or repair anything.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::population::{AgentId, Population, PopulationEntry};

/// Current roster format version.
pub const ROSTER_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RosterError {
    #[display("malformed roster: {reason}")]
    MalformedRoster {
        #[error(not(source))]
        reason: String,
    },
}

fn malformed(reason: impl Into<String>) -> RosterError {
    RosterError::MalformedRoster {
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub version: u32,
    /// Highest generation of any entry.
    pub generation: u32,
    /// Id the next created agent will receive.
    pub next_id: u32,
    pub entries: Vec<PopulationEntry>,
}

impl Roster {
    #[must_use]
    pub fn from_population(population: &Population) -> Self {
        Self {
            version: ROSTER_VERSION,
            generation: population.max_generation(),
            next_id: u32::try_from(population.len()).unwrap_or(u32::MAX),
            entries: population.entries().to_vec(),
        }
    }

    /// Validates the roster and rebuilds the population.
    pub fn into_population(self) -> Result<Population, RosterError> {
        if self.version != ROSTER_VERSION {
            return Err(malformed(format!(
                "unsupported version {} (expected {ROSTER_VERSION})",
                self.version
            )));
        }

        let mut seen = HashSet::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let id = entry.id();
            if !seen.insert(id) {
                return Err(malformed(format!("duplicate agent id {id}")));
            }
            if u32::try_from(index).ok() != Some(id.get()) {
                return Err(malformed(format!(
                    "agent {id} is stored at position {index}"
                )));
            }
            for parent in entry.lineage().parents() {
                if parent >= id {
                    return Err(malformed(format!(
                        "agent {id} names unknown parent {parent}"
                    )));
                }
            }
        }

        if usize::try_from(self.next_id).ok() != Some(self.entries.len()) {
            return Err(malformed(format!(
                "next id {} does not follow the last of {} entries",
                AgentId::new(self.next_id),
                self.entries.len()
            )));
        }

        if let Some((first, rest)) = self.entries.split_first() {
            let shape = first.agent().shape();
            if let Some(other) = rest.iter().find(|e| e.agent().shape() != shape) {
                return Err(malformed(format!(
                    "agent {} has shape {} but agent {} has shape {shape}",
                    other.id(),
                    other.agent().shape(),
                    first.id()
                )));
            }
        }

        let population = Population::from_entries_unchecked(self.entries);
        if population.max_generation() != self.generation {
            return Err(malformed(format!(
                "generation counter {} does not match the newest entry ({})",
                self.generation,
                population.max_generation()
            )));
        }
        Ok(population)
    }
}
