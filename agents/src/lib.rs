pub mod config;
pub mod evaluation;
pub mod external;
pub mod greedy;
pub mod match_runner;
pub mod minimax;
pub mod random;
pub mod rollout;
pub mod search;
pub mod value_table;

use std::fmt;

use chess_core::{Color, GameState, Move, Promotion};

/// A move chosen by an agent, optionally with the promotion it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentMove {
    pub mv: Move,
    pub promotion: Option<Promotion>,
}

impl AgentMove {
    pub fn new(mv: Move) -> Self {
        Self {
            mv,
            promotion: None,
        }
    }
}

impl From<Move> for AgentMove {
    fn from(mv: Move) -> Self {
        Self::new(mv)
    }
}

impl fmt::Display for AgentMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mv)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.piece_type().letter())?;
        }
        Ok(())
    }
}

/// Core trait for chess agents.
///
/// Agents may apply and undo moves on the state while deciding, but must
/// leave it exactly as they found it.
pub trait Agent {
    /// Picks a move for the side to move, or `None` when it has no legal move.
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove>;

    /// Chooses the piece for a pending promotion.
    fn pick_promotion(&mut self, _color: Color) -> Promotion {
        Promotion::Queen
    }

    /// Get the agent's name
    fn name(&self) -> &str;
}

pub use config::{AgentConfig, ConfigError};
pub use evaluation::{material_balance, piece_value, Evaluator};
pub use external::{EngineLink, ExternalAgent, ExternalError, UciProcess};
pub use greedy::GreedyAgent;
pub use match_runner::{play_match, MatchEnd, MatchResult};
pub use minimax::MinimaxAgent;
pub use random::RandomAgent;
pub use rollout::RolloutAgent;
pub use search::*;
pub use value_table::ValueTableAgent;
