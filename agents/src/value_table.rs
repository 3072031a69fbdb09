use std::collections::HashMap;

use chess_core::{GameState, Move};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{Agent, AgentMove};

pub const DEFAULT_EPSILON: f64 = 0.15;

/// Epsilon-greedy agent over a table of (position, move) values.
///
/// Unknown pairs are worth zero. With probability `epsilon` it explores with
/// a random legal move; otherwise it plays the highest-valued move, ties
/// going to the earliest in generation order.
pub struct ValueTableAgent {
    name: String,
    epsilon: f64,
    values: HashMap<(String, Move), f64>,
    rng: StdRng,
}

impl ValueTableAgent {
    pub fn new() -> Self {
        ValueTableAgent {
            name: "ValueTable".to_string(),
            epsilon: DEFAULT_EPSILON,
            values: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Exploration rate, clamped to `0.0..=1.0`.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.clamp(0.0, 1.0);
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn value(&self, state: &GameState, mv: Move) -> f64 {
        self.values
            .get(&(position_key(state), mv))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_value(&mut self, state: &GameState, mv: Move, value: f64) {
        self.values.insert((position_key(state), mv), value);
    }
}

impl Default for ValueTableAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn position_key(state: &GameState) -> String {
    state.to_fen()
}

impl Agent for ValueTableAgent {
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove> {
        let moves = state.all_legal_moves(state.turn);
        if moves.is_empty() {
            return None;
        }

        if self.rng.gen_bool(self.epsilon) {
            return moves.as_slice().choose(&mut self.rng).map(|&mv| AgentMove::new(mv));
        }

        let key = position_key(state);
        let mut best: Option<(Move, f64)> = None;
        for &mv in moves.iter() {
            let value = self
                .values
                .get(&(key.clone(), mv))
                .copied()
                .unwrap_or(0.0);
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((mv, value));
            }
        }
        best.map(|(mv, _)| AgentMove::new(mv))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
