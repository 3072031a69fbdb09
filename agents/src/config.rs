//! Agent selection from short text specs such as `minimax:3`,
//! `iterative:4:pst` or `rollout:40:6`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::evaluation::Evaluator;
use crate::external::{ExternalAgent, ExternalError, UciProcess};
use crate::greedy::GreedyAgent;
use crate::minimax::MinimaxAgent;
use crate::random::RandomAgent;
use crate::rollout::RolloutAgent;
use crate::value_table::ValueTableAgent;
use crate::Agent;

pub const DEFAULT_DEPTH: u8 = 2;
pub const DEFAULT_TRIALS: u32 = 10;
pub const DEFAULT_ROLLOUT_DEPTH: u32 = 6;

/// Trailing parameter selecting the knight centrality table.
const KNIGHT_TABLE_FLAG: &str = "pst";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "unknown agent kind {0:?} (expected random, greedy, table, minimax, iterative, rollout or external)"
    )]
    UnknownKind(String),

    #[error("invalid number {value:?} in agent spec {spec:?}")]
    InvalidNumber { spec: String, value: String },

    #[error("too many parameters in agent spec {0:?}")]
    TooManyParameters(String),

    #[error("external agent needs an engine path")]
    MissingPath,
}

/// Which agent to build and with what parameters.
///
/// `knight_table` switches the evaluator from plain material to material
/// plus knight centrality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentConfig {
    Random,
    Greedy { knight_table: bool },
    ValueTable,
    Minimax { depth: u8, knight_table: bool },
    Iterative { depth: u8, knight_table: bool },
    Rollout { trials: u32, depth: u32 },
    External { path: String },
}

fn evaluator(knight_table: bool) -> Evaluator {
    if knight_table {
        Evaluator::WITH_KNIGHT_TABLE
    } else {
        Evaluator::MATERIAL
    }
}

impl AgentConfig {
    /// Builds the agent. A seed makes the random parts reproducible.
    pub fn build(&self, seed: Option<u64>) -> Result<Box<dyn Agent>, ExternalError> {
        let random = || match seed {
            Some(seed) => RandomAgent::with_seed(seed),
            None => RandomAgent::new(),
        };

        let agent: Box<dyn Agent> = match self {
            AgentConfig::Random => Box::new(random()),
            AgentConfig::Greedy { knight_table } => {
                Box::new(GreedyAgent::new().with_evaluation(evaluator(*knight_table)))
            }
            AgentConfig::ValueTable => {
                let agent = ValueTableAgent::new();
                Box::new(match seed {
                    Some(seed) => agent.with_seed(seed),
                    None => agent,
                })
            }
            AgentConfig::Minimax {
                depth,
                knight_table,
            } => Box::new(MinimaxAgent::new(*depth).with_evaluation(evaluator(*knight_table))),
            AgentConfig::Iterative {
                depth,
                knight_table,
            } => Box::new(
                MinimaxAgent::new(*depth)
                    .with_iterative_deepening()
                    .with_evaluation(evaluator(*knight_table)),
            ),
            AgentConfig::Rollout { trials, depth } => {
                let agent = RolloutAgent::new(*trials, *depth);
                Box::new(match seed {
                    Some(seed) => agent.with_seed(seed),
                    None => agent,
                })
            }
            AgentConfig::External { path } => {
                let link = UciProcess::spawn(path)?;
                Box::new(
                    ExternalAgent::new(link)
                        .with_name(format!("External({path})"))
                        .with_fallback(random()),
                )
            }
        };
        Ok(agent)
    }
}

fn parse_number<T: FromStr>(spec: &str, value: Option<&str>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
            spec: spec.to_string(),
            value: value.to_string(),
        }),
    }
}

impl FromStr for AgentConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = match s.split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (s, None),
        };

        // Paths may contain ':' themselves, so take the remainder whole.
        if kind.eq_ignore_ascii_case("external") {
            return match rest {
                Some(path) if !path.is_empty() => Ok(AgentConfig::External {
                    path: path.to_string(),
                }),
                _ => Err(ConfigError::MissingPath),
            };
        }

        let mut params: Vec<&str> = rest.map_or_else(Vec::new, |r| r.split(':').collect());
        let kind = kind.to_ascii_lowercase();

        let takes_evaluator = matches!(kind.as_str(), "greedy" | "minimax" | "iterative");
        let knight_table = takes_evaluator
            && params
                .last()
                .is_some_and(|p| p.eq_ignore_ascii_case(KNIGHT_TABLE_FLAG));
        if knight_table {
            params.pop();
        }

        let max_params = match kind.as_str() {
            "random" | "greedy" | "table" => 0,
            "rollout" => 2,
            "minimax" | "iterative" => 1,
            _ => return Err(ConfigError::UnknownKind(kind)),
        };
        if params.len() > max_params {
            return Err(ConfigError::TooManyParameters(s.to_string()));
        }

        let first = params.first().copied();
        let second = params.get(1).copied();

        Ok(match kind.as_str() {
            "random" => AgentConfig::Random,
            "greedy" => AgentConfig::Greedy { knight_table },
            "table" => AgentConfig::ValueTable,
            "minimax" => AgentConfig::Minimax {
                depth: parse_number(s, first, DEFAULT_DEPTH)?,
                knight_table,
            },
            "iterative" => AgentConfig::Iterative {
                depth: parse_number(s, first, DEFAULT_DEPTH)?,
                knight_table,
            },
            _ => AgentConfig::Rollout {
                trials: parse_number(s, first, DEFAULT_TRIALS)?,
                depth: parse_number(s, second, DEFAULT_ROLLOUT_DEPTH)?,
            },
        })
    }
}

impl fmt::Display for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |knight_table: bool| {
            if knight_table {
                format!(":{KNIGHT_TABLE_FLAG}")
            } else {
                String::new()
            }
        };
        match self {
            AgentConfig::Random => f.write_str("random"),
            AgentConfig::Greedy { knight_table } => write!(f, "greedy{}", flag(*knight_table)),
            AgentConfig::ValueTable => f.write_str("table"),
            AgentConfig::Minimax {
                depth,
                knight_table,
            } => write!(f, "minimax:{depth}{}", flag(*knight_table)),
            AgentConfig::Iterative {
                depth,
                knight_table,
            } => write!(f, "iterative:{depth}{}", flag(*knight_table)),
            AgentConfig::Rollout { trials, depth } => write!(f, "rollout:{trials}:{depth}"),
            AgentConfig::External { path } => write!(f, "external:{path}"),
        }
    }
}
