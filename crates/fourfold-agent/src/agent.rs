use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    AgentError,
    weights::{self, MutationParams},
};

/// Fixed topology and initialization parameters of an [`Agent`].
///
/// Two agents can only be crossed when their shapes are equal, including the
/// initialization range and bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentShape {
    /// Input layer size (one neuron per board cell).
    pub inputs: usize,
    /// Output layer size (one neuron per board column).
    pub outputs: usize,
    /// Hidden layer size.
    pub hidden: usize,
    /// Upper bound of the uniform range used to initialize both weight matrices.
    pub start_range: f32,
    /// Constant every hidden bias starts from.
    pub start_bias: f32,
}

impl Default for AgentShape {
    fn default() -> Self {
        Self {
            inputs: 42,
            outputs: 7,
            hidden: 14,
            start_range: 2.0,
            start_bias: 1.0,
        }
    }
}

impl fmt::Display for AgentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{} (start range {}, start bias {})",
            self.inputs, self.hidden, self.outputs, self.start_range, self.start_bias
        )
    }
}

impl AgentShape {
    /// Shape for a board with `cells` cells and `columns` columns.
    #[must_use]
    pub fn for_board(cells: usize, columns: usize, hidden: usize) -> Self {
        Self {
            inputs: cells,
            outputs: columns,
            hidden,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_init(self, start_range: f32, start_bias: f32) -> Self {
        Self {
            start_range,
            start_bias,
            ..self
        }
    }
}

/// A two-layer feedforward network scoring board columns.
///
/// The tensors are stored row-major:
///
/// - `input_weights`: `hidden × inputs`
/// - `output_weights`: `outputs × hidden`
/// - `hidden_bias`: `hidden`
///
/// The shape never changes after construction. [`Agent::mutate`] only rewrites
/// values and [`Agent::cross`] produces a new agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAgent")]
pub struct Agent {
    shape: AgentShape,
    input_weights: Vec<f32>,
    output_weights: Vec<f32>,
    hidden_bias: Vec<f32>,
}

#[derive(Deserialize)]
struct RawAgent {
    shape: AgentShape,
    input_weights: Vec<f32>,
    output_weights: Vec<f32>,
    hidden_bias: Vec<f32>,
}

impl TryFrom<RawAgent> for Agent {
    type Error = AgentError;

    fn try_from(raw: RawAgent) -> Result<Self, Self::Error> {
        Agent::from_weights(
            raw.shape,
            raw.input_weights,
            raw.output_weights,
            raw.hidden_bias,
        )
    }
}

fn check_len(tensor: &'static str, expected: usize, actual: usize) -> Result<(), AgentError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AgentError::DimensionMismatch {
            tensor,
            expected,
            actual,
        })
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Agent {
    /// Creates an agent with both weight matrices drawn uniformly from
    /// `[0, start_range)` and every hidden bias set to `start_bias`.
    pub fn random<R>(shape: AgentShape, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            shape,
            input_weights: weights::random(rng, shape.start_range, shape.hidden * shape.inputs),
            output_weights: weights::random(rng, shape.start_range, shape.outputs * shape.hidden),
            hidden_bias: weights::from_fn(|_| shape.start_bias, shape.hidden),
        }
    }

    /// Creates an agent from explicit tensors, checking their lengths against `shape`.
    pub fn from_weights(
        shape: AgentShape,
        input_weights: Vec<f32>,
        output_weights: Vec<f32>,
        hidden_bias: Vec<f32>,
    ) -> Result<Self, AgentError> {
        if shape.inputs == 0 || shape.outputs == 0 || shape.hidden == 0 {
            return Err(AgentError::EmptyLayer { shape });
        }
        check_len(
            "input weights",
            shape.hidden * shape.inputs,
            input_weights.len(),
        )?;
        check_len(
            "output weights",
            shape.outputs * shape.hidden,
            output_weights.len(),
        )?;
        check_len("hidden bias", shape.hidden, hidden_bias.len())?;
        Ok(Self {
            shape,
            input_weights,
            output_weights,
            hidden_bias,
        })
    }

    #[must_use]
    pub fn shape(&self) -> &AgentShape {
        &self.shape
    }

    #[must_use]
    pub fn input_weights(&self) -> &[f32] {
        &self.input_weights
    }

    #[must_use]
    pub fn output_weights(&self) -> &[f32] {
        &self.output_weights
    }

    #[must_use]
    pub fn hidden_bias(&self) -> &[f32] {
        &self.hidden_bias
    }

    /// Iterates over every scalar of the three tensors.
    pub fn all_weights(&self) -> impl Iterator<Item = f32> + '_ {
        self.input_weights
            .iter()
            .chain(&self.output_weights)
            .chain(&self.hidden_bias)
            .copied()
    }

    /// Scores every output column for an encoded board.
    ///
    /// Computes `sigmoid(W_out · tanh(W_in · input − bias))`. Every score lies in
    /// `(0, 1)`; a higher score means a more preferred column.
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>, AgentError> {
        let AgentShape {
            inputs,
            outputs,
            hidden,
            ..
        } = self.shape;
        check_len("input", inputs, input.len())?;

        let activations = self
            .input_weights
            .chunks_exact(inputs)
            .zip(&self.hidden_bias)
            .map(|(row, bias)| {
                let sum = row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>();
                (sum - bias).tanh()
            })
            .collect::<Vec<_>>();

        let scores = self
            .output_weights
            .chunks_exact(hidden)
            .map(|row| sigmoid(row.iter().zip(&activations).map(|(w, a)| w * a).sum()))
            .collect::<Vec<_>>();
        debug_assert_eq!(scores.len(), outputs);
        Ok(scores)
    }

    /// Applies multiplicative mutation to all three tensors.
    pub fn mutate<R>(&mut self, params: MutationParams, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        weights::mutate(&mut self.input_weights, params, rng);
        weights::mutate(&mut self.output_weights, params, rng);
        weights::mutate(&mut self.hidden_bias, params, rng);
    }

    /// Produces a child whose every weight comes from `self` or `other`.
    ///
    /// The choice is made independently and uniformly for each entry. Both
    /// parents are left untouched.
    pub fn cross<R>(&self, other: &Agent, rng: &mut R) -> Result<Agent, AgentError>
    where
        R: Rng + ?Sized,
    {
        if self.shape != other.shape {
            return Err(AgentError::IncompatibleAgents {
                left: self.shape,
                right: other.shape,
            });
        }
        Ok(Agent {
            shape: self.shape,
            input_weights: weights::uniform_crossover(
                &self.input_weights,
                &other.input_weights,
                rng,
            ),
            output_weights: weights::uniform_crossover(
                &self.output_weights,
                &other.output_weights,
                rng,
            ),
            hidden_bias: weights::uniform_crossover(&self.hidden_bias, &other.hidden_bias, rng),
        })
    }
}
