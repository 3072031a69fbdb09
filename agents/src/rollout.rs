use chess_core::{Color, GameState, Move, Promotion, ScopedMove};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{Agent, AgentMove};

/// Chance of under-promoting to a knight instead of a queen.
const KNIGHT_PROMOTION_CHANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
struct MoveStats {
    mv: Move,
    sum: f64,
    visits: u32,
}

impl MoveStats {
    fn average(&self) -> f64 {
        self.sum / f64::from(self.visits)
    }
}

/// Monte-Carlo agent: random root moves followed by short random playouts,
/// scored by material balance.
pub struct RolloutAgent {
    name: String,
    trials: u32,
    depth: u32,
    rng: StdRng,
}

impl RolloutAgent {
    pub fn new(trials: u32, depth: u32) -> Self {
        RolloutAgent {
            name: format!("Rollout(trials={trials}, depth={depth})"),
            trials,
            depth,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    /// Changes the trial count between games.
    pub fn set_trials(&mut self, trials: u32) {
        self.trials = trials;
    }

    /// Plays random moves for up to `depth` plies and returns the material
    /// balance for `perspective`. Every move is undone on the way back.
    fn playout(&mut self, node: &mut ScopedMove<'_>, depth: u32, perspective: Color) -> f64 {
        let evaluation = f64::from(node.material().diff())
            * match perspective {
                Color::White => 1.0,
                Color::Black => -1.0,
            };
        if depth == 0 {
            return evaluation;
        }

        let moves = node.all_legal_moves(node.turn);
        let Some(&mv) = moves.as_slice().choose(&mut self.rng) else {
            return evaluation;
        };

        match node.nest(mv) {
            Ok(mut child) => self.playout(&mut child, depth - 1, perspective),
            Err(_) => evaluation,
        }
    }
}

impl Agent for RolloutAgent {
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove> {
        let color = state.turn;
        let moves = state.all_legal_moves(color);
        let first = *moves.as_slice().first()?;
        let mut root = ScopedMove::root(state);

        // Kept in first-seen order so ties go to the earliest move.
        let mut stats: Vec<MoveStats> = Vec::new();

        for _ in 0..self.trials {
            let Some(&mv) = moves.as_slice().choose(&mut self.rng) else {
                break;
            };
            let value = match root.nest(mv) {
                Ok(mut child) => self.playout(&mut child, self.depth, color),
                Err(_) => continue,
            };

            match stats.iter_mut().find(|s| s.mv == mv) {
                Some(entry) => {
                    entry.sum += value;
                    entry.visits += 1;
                }
                None => stats.push(MoveStats {
                    mv,
                    sum: value,
                    visits: 1,
                }),
            }
        }

        let mut best: Option<&MoveStats> = None;
        for entry in &stats {
            if best.map_or(true, |b| entry.average() > b.average()) {
                best = Some(entry);
            }
        }

        let chosen = best.map_or(first, |b| b.mv);
        debug!(
            "{} chose {chosen} from {} sampled moves",
            self.name,
            stats.len()
        );
        Some(AgentMove::new(chosen))
    }

    fn pick_promotion(&mut self, _color: Color) -> Promotion {
        if self.rng.gen_bool(KNIGHT_PROMOTION_CHANCE) {
            Promotion::Knight
        } else {
            Promotion::Queen
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_state_unchanged() {
        let mut state = GameState::new();
        let before = state.clone();
        let choice = RolloutAgent::new(30, 6)
            .with_seed(3)
            .pick_move(&mut state)
            .unwrap();

        assert!(state.all_legal_moves(Color::White).contains(choice.mv));
        assert_eq!(state, before);
    }

    #[test]
    fn test_grabs_free_queen() {
        // Only the capture changes material at depth 0.
        let mut state = GameState::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
        let choice = RolloutAgent::new(400, 0)
            .with_seed(11)
            .pick_move(&mut state)
            .unwrap();
        assert_eq!(choice.mv, "d1d5".parse::<Move>().unwrap());
    }

    #[test]
    fn test_zero_trials_falls_back_to_first_move() {
        let mut state = GameState::new();
        let first = state.all_legal_moves(Color::White).as_slice()[0];
        let choice = RolloutAgent::new(0, 4).pick_move(&mut state).unwrap();
        assert_eq!(choice.mv, first);
    }

    #[test]
    fn test_ties_keep_first_seen_move() {
        // Depth 0 from the start: every move averages zero.
        let mut state = GameState::new();
        let mut agent = RolloutAgent::new(50, 0).with_seed(5);
        let choice = agent.pick_move(&mut state).unwrap();

        let mut replay = RolloutAgent::new(50, 0).with_seed(5);
        let moves = state.all_legal_moves(Color::White);
        let first_sampled = *moves.as_slice().choose(&mut replay.rng).unwrap();
        assert_eq!(choice.mv, first_sampled);
    }

    #[test]
    fn test_promotion_choice_is_queen_or_knight() {
        let mut agent = RolloutAgent::new(1, 1).with_seed(9);
        let choices: Vec<Promotion> = (0..200).map(|_| agent.pick_promotion(Color::White)).collect();

        assert!(choices
            .iter()
            .all(|p| matches!(p, Promotion::Queen | Promotion::Knight)));
        assert!(choices.iter().filter(|&&p| p == Promotion::Queen).count() > 150);
    }

    #[test]
    fn test_no_move_when_mated() {
        let mut state =
            GameState::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 0 1")
                .unwrap();
        assert_eq!(RolloutAgent::new(10, 3).pick_move(&mut state), None);
    }
}
