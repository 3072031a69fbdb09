//! Plays two agents against each other on one game state.

use chess_core::{ChessError, Color, GameState, GameStatus, Scores};
use log::{info, warn};

use crate::{Agent, AgentMove};

/// Why a match stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEnd {
    /// Checkmate or stalemate.
    Finished(GameStatus),
    PlyLimit,
    /// The side to move had legal moves but its agent returned none.
    NoMove(Color),
    /// The agent for `color` produced a move the board rejected.
    Rejected { color: Color, error: ChessError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub end: MatchEnd,
    pub moves: Vec<AgentMove>,
    pub scores: Scores,
    pub final_fen: String,
}

impl MatchResult {
    pub fn winner(&self) -> Option<Color> {
        match &self.end {
            MatchEnd::Finished(status) => status.winner(),
            _ => None,
        }
    }

    pub fn plies(&self) -> usize {
        self.moves.len()
    }
}

/// Alternates `white` and `black` from the current position until the game is
/// over or `max_plies` half-moves have been played.
///
/// Promotions use the move's own choice when it carries one, otherwise the
/// moving agent's `pick_promotion`.
pub fn play_match(
    state: &mut GameState,
    white: &mut dyn Agent,
    black: &mut dyn Agent,
    max_plies: usize,
) -> MatchResult {
    let mut moves = Vec::new();

    let end = loop {
        let status = state.status();
        if status.is_over() {
            break MatchEnd::Finished(status);
        }
        if moves.len() >= max_plies {
            break MatchEnd::PlyLimit;
        }

        let color = state.turn;
        let agent: &mut dyn Agent = match color {
            Color::White => &mut *white,
            Color::Black => &mut *black,
        };

        let Some(choice) = agent.pick_move(state) else {
            warn!("{} ({color}) returned no move", agent.name());
            break MatchEnd::NoMove(color);
        };

        if let Err(error) = apply_choice(state, agent, choice) {
            warn!("{} ({color}) played {choice}: {error}", agent.name());
            break MatchEnd::Rejected { color, error };
        }

        info!(
            "{:>3}. {color} {} plays {}",
            moves.len() + 1,
            agent.name(),
            choice
        );
        moves.push(choice);
    };

    info!("match over after {} plies: {:?}", moves.len(), end);

    MatchResult {
        end,
        moves,
        scores: state.scores(),
        final_fen: state.to_fen(),
    }
}

fn apply_choice(
    state: &mut GameState,
    agent: &mut dyn Agent,
    choice: AgentMove,
) -> Result<(), ChessError> {
    state.apply_move(choice.mv.from, choice.mv.to)?;

    if let Some(pending) = state.pending_promotion() {
        let promotion = choice
            .promotion
            .unwrap_or_else(|| agent.pick_promotion(pending.color));
        state.resolve_promotion(promotion)?;
    }
    Ok(())
}
