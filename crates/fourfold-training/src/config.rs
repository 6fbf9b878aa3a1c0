use fourfold_agent::{AgentShape, weights::MutationParams};
use fourfold_engine::{BoardSize, InvalidBoardSize};
use serde::{Deserialize, Serialize};

use crate::population::{ScorePolicy, SelectionCriterion};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ConfigError {
    #[display("invalid configuration: {_0}")]
    #[from(ignore)]
    Validation(#[error(not(source))] String),
    #[display("invalid configuration: {_0}")]
    BoardSize(InvalidBoardSize),
}

/// Parameters of an evolution run.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it changes.
///
/// ```
/// use fourfold_training::config::EvolutionConfig;
///
/// let config: EvolutionConfig = serde_json::from_str(r#"{"population": 4, "seed": 7}"#).unwrap();
/// assert_eq!(config.population, 4);
/// assert_eq!(config.generations, 10);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Number of survivors kept per generation; `2 * population` agents are alive
    /// during each round.
    pub population: usize,
    pub generations: u32,
    pub rows: usize,
    pub columns: usize,
    pub hidden: usize,
    pub start_range: f32,
    pub start_bias: f32,
    pub mutation: MutationParams,
    pub selection: SelectionCriterion,
    pub score_policy: ScorePolicy,
    /// Worker threads used to play a round.
    pub threads: usize,
    /// RNG seed; a random seed is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        let shape = AgentShape::default();
        Self {
            population: 10,
            generations: 10,
            rows: BoardSize::STANDARD.rows(),
            columns: BoardSize::STANDARD.columns(),
            hidden: shape.hidden,
            start_range: shape.start_range,
            start_bias: shape.start_bias,
            mutation: MutationParams::default(),
            selection: SelectionCriterion::default(),
            score_policy: ScorePolicy::default(),
            threads: 1,
            seed: None,
        }
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Validation(reason.to_owned())
}

impl EvolutionConfig {
    pub fn board_size(&self) -> Result<BoardSize, ConfigError> {
        Ok(BoardSize::new(self.rows, self.columns)?)
    }

    /// Agent topology matching the configured board.
    pub fn agent_shape(&self) -> Result<AgentShape, ConfigError> {
        let size = self.board_size()?;
        Ok(
            AgentShape::for_board(size.cell_count(), size.columns(), self.hidden)
                .with_init(self.start_range, self.start_bias),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board_size()?;
        if self.population == 0 {
            return Err(invalid("population must be >= 1"));
        }
        if self.hidden == 0 {
            return Err(invalid("hidden must be >= 1"));
        }
        if !(self.start_range.is_finite() && self.start_range > 0.0) {
            return Err(invalid("start_range must be a finite value > 0"));
        }
        if !(self.start_bias.is_finite() && self.start_bias >= 0.0) {
            return Err(invalid("start_bias must be a finite value >= 0"));
        }
        if !(0.0..=1.0).contains(&self.mutation.rate) {
            return Err(invalid("mutation.rate must be in [0, 1]"));
        }
        if !(self.mutation.factor.is_finite() && self.mutation.factor >= 0.0) {
            return Err(invalid("mutation.factor must be a finite value >= 0"));
        }
        if self.threads == 0 {
            return Err(invalid("threads must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EvolutionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.agent_shape().unwrap(), AgentShape::default());
    }

    #[test]
    fn test_agent_shape_follows_board() {
        let config = EvolutionConfig {
            rows: 5,
            columns: 8,
            hidden: 3,
            start_bias: 0.5,
            ..EvolutionConfig::default()
        };
        let shape = config.agent_shape().unwrap();
        assert_eq!((shape.inputs, shape.outputs, shape.hidden), (40, 8, 3));
        assert!((shape.start_bias - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            EvolutionConfig {
                population: 0,
                ..EvolutionConfig::default()
            },
            EvolutionConfig {
                threads: 0,
                ..EvolutionConfig::default()
            },
            EvolutionConfig {
                start_range: -1.0,
                ..EvolutionConfig::default()
            },
            EvolutionConfig {
                mutation: MutationParams {
                    rate: 1.5,
                    factor: 0.25,
                },
                ..EvolutionConfig::default()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        }

        let config = EvolutionConfig {
            rows: 3,
            ..EvolutionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BoardSize(_))));
    }

    #[test]
    fn test_enum_fields_use_snake_case() {
        let config: EvolutionConfig = serde_json::from_str(
            r#"{"selection": "win_loss_ratio", "score_policy": "reset_each_round"}"#,
        )
        .unwrap();
        assert_eq!(config.selection, SelectionCriterion::WinLossRatio);
        assert_eq!(config.score_policy, ScorePolicy::ResetEachRound);
    }
}
