//! Neural column scorers evolved by the training crate.
//!
//! An [`Agent`] is a fixed-topology two-layer network: a `tanh` hidden layer with a
//! subtracted bias followed by a `sigmoid` output layer with one neuron per board
//! column. It takes a plain encoded board (`&[f32]`, one value per cell) and has no
//! knowledge of the board type itself.
//!
//! Besides [`Agent::forward`] the agent exposes the two genetic operators used by
//! the population manager:
//!
//! - [`Agent::mutate`] - multiplicative Gaussian mutation (see [`weights::mutate`])
//! - [`Agent::cross`] - uniform per-entry crossover between two equally shaped agents
//!
//! # Example
//!
//! ```
//! use fourfold_agent::{Agent, AgentShape, weights::MutationParams};
//!
//! let mut rng = rand::rng();
//! let shape = AgentShape::default();
//! let mother = Agent::random(shape, &mut rng);
//! let father = Agent::random(shape, &mut rng);
//!
//! let mut child = mother.cross(&father, &mut rng).unwrap();
//! child.mutate(MutationParams::default(), &mut rng);
//!
//! let scores = child.forward(&[0.0; 42]).unwrap();
//! assert_eq!(scores.len(), 7);
//! ```

pub use self::agent::*;

mod agent;
pub mod weights;

/// Errors raised by agent construction and evaluation.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum AgentError {
    #[display("{tensor} has length {actual}, expected {expected}")]
    DimensionMismatch {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("every layer needs at least one neuron: {shape}")]
    EmptyLayer { shape: AgentShape },
    #[display("cannot cross agents of different shapes: {left} and {right}")]
    IncompatibleAgents {
        left: AgentShape,
        right: AgentShape,
    },
}
