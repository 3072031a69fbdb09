use chess_core::{GameState, ScopedMove};
use log::debug;

use crate::evaluation::Evaluator;
use crate::{Agent, AgentMove};

/// One-ply lookahead: plays the move whose resulting position evaluates best
/// for the mover. Ties keep the earliest move in generation order.
pub struct GreedyAgent {
    name: String,
    evaluator: Evaluator,
}

impl GreedyAgent {
    pub fn new() -> Self {
        GreedyAgent {
            name: "Greedy".to_string(),
            evaluator: Evaluator::MATERIAL,
        }
    }

    pub fn with_evaluation(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }
}

impl Default for GreedyAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for GreedyAgent {
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove> {
        let color = state.turn;
        let moves = state.all_legal_moves(color);
        let first = *moves.as_slice().first()?;
        let mut root = ScopedMove::root(state);

        let mut best = None;
        for &mv in moves.iter() {
            let Ok(child) = root.nest(mv) else {
                continue;
            };
            let score = self.evaluator.evaluate(&child, color);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((mv, score));
            }
        }

        let chosen = best.map_or(first, |(mv, _)| mv);
        debug!("{} chose {chosen} ({:?})", self.name, best.map(|(_, s)| s));
        Some(AgentMove::new(chosen))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
