use chess_core::GameState;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Agent, AgentMove};

/// Plays a uniformly random legal move.
pub struct RandomAgent {
    name: String,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent {
            name: "Random".to_string(),
            rng: StdRng::from_entropy(),
        }
    }

    /// A reproducible agent for tests and seeded matches.
    pub fn with_seed(seed: u64) -> Self {
        RandomAgent {
            name: "Random".to_string(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove> {
        let moves = state.all_legal_moves(state.turn);
        moves
            .as_slice()
            .choose(&mut self.rng)
            .map(|&mv| AgentMove::new(mv))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
