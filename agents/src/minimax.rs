use chess_core::GameState;
use log::debug;

use crate::evaluation::Evaluator;
use crate::search::{search_with, SearchLimits, SearchOptions, SearchResult};
use crate::{Agent, AgentMove};

/// Negamax with alpha-beta pruning, optionally iterated over increasing depths.
pub struct MinimaxAgent {
    name: String,
    limits: SearchLimits,
    options: SearchOptions,
}

impl MinimaxAgent {
    pub fn new(depth: u8) -> Self {
        MinimaxAgent {
            name: format!("Minimax(depth={})", depth),
            limits: SearchLimits::depth(depth),
            options: SearchOptions::default(),
        }
    }

    pub fn with_iterative_deepening(mut self) -> Self {
        self.options.iterative_deepening = true;
        self.name = format!("Iterative(depth={})", self.limits.max_depth);
        self
    }

    pub fn with_capture_ordering(mut self, enabled: bool) -> Self {
        self.options.capture_ordering = enabled;
        self
    }

    pub fn with_evaluation(mut self, evaluator: Evaluator) -> Self {
        self.options.evaluator = evaluator;
        self
    }

    /// Replaces depth and budget together.
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn depth(&self) -> u8 {
        self.limits.max_depth
    }

    /// Changes the depth between games.
    pub fn set_depth(&mut self, depth: u8) {
        self.limits.max_depth = depth;
    }

    /// Runs the configured search without committing to a move.
    pub fn analyze(&self, state: &mut GameState) -> SearchResult {
        search_with(state, self.limits, self.options)
    }
}

impl Agent for MinimaxAgent {
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove> {
        // A move needs at least one ply of lookahead.
        let limits = SearchLimits {
            max_depth: self.limits.max_depth.max(1),
            ..self.limits
        };

        let result = search_with(state, limits, self.options);
        debug!(
            "{} chose {:?} (score {}, depth {}, {} nodes)",
            self.name,
            result.best_move.map(|m| m.to_string()),
            result.score,
            result.depth,
            result.nodes
        );
        result.best_move.map(AgentMove::new)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Move;

    #[test]
    fn test_captures_free_rook() {
        let mut state = GameState::from_fen("4k3/8/8/8/8/8/r7/R3K3 w - - 0 1").unwrap();
        let before = state.clone();

        let choice = MinimaxAgent::new(2).pick_move(&mut state).unwrap();
        assert_eq!(choice.mv, "a1a2".parse::<Move>().unwrap());
        assert_eq!(state, before);
    }

    #[test]
    fn test_depth_zero_still_moves() {
        let mut state = GameState::new();
        let mut agent = MinimaxAgent::new(0);

        assert_eq!(agent.analyze(&mut state).best_move, None);
        assert!(agent.pick_move(&mut state).is_some());
    }

    #[test]
    fn test_iterative_agent_names_and_depth() {
        let mut agent = MinimaxAgent::new(3).with_iterative_deepening();
        assert_eq!(agent.name(), "Iterative(depth=3)");
        agent.set_depth(2);
        assert_eq!(agent.depth(), 2);

        let mut state = GameState::new();
        let result = agent.analyze(&mut state);
        assert_eq!(result.depth, 2);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_no_move_when_stalemated() {
        let mut state = GameState::from_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1").unwrap();
        assert_eq!(MinimaxAgent::new(2).pick_move(&mut state), None);
    }
}
