use crate::game_state::GameState;
use crate::mover::ScopedMove;
use crate::types::{Move, Promotion};

/// Perft (performance test) results at each depth.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerftResults {
    pub nodes: u64,
    pub captures: u64,
    pub en_passants: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftResults {
    /// Combines results from child nodes.
    pub fn add(&mut self, other: &Self) {
        self.nodes += other.nodes;
        self.captures += other.captures;
        self.en_passants += other.en_passants;
        self.castles += other.castles;
        self.promotions += other.promotions;
        self.checks += other.checks;
        self.checkmates += other.checkmates;
    }
}

/// Promotion choices to expand for `mv`: all four on the last rank, none otherwise.
fn choices(state: &GameState, mv: Move) -> &'static [Promotion] {
    if state.is_promotion_move(mv) {
        &Promotion::ALL
    } else {
        &Promotion::ALL[..1]
    }
}

/// Counts leaf nodes of the legal move tree to the given depth.
///
/// Each promotion counts once per choice. The state is restored on return.
pub fn perft(state: &mut GameState, depth: u8) -> u64 {
    count_nodes(&mut ScopedMove::root(state), depth)
}

fn count_nodes(node: &mut ScopedMove<'_>, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = node.all_legal_moves(node.turn);
    let mut nodes = 0;

    for mv in moves.iter() {
        for &choice in choices(node, *mv) {
            if depth == 1 {
                nodes += 1;
                continue;
            }
            let Ok(mut child) = node.nest_with(*mv, choice) else {
                continue;
            };
            nodes += count_nodes(&mut child, depth - 1);
        }
    }

    nodes
}

/// Node counts below each root move. Promotions report one entry per choice.
pub fn perft_divide(state: &mut GameState, depth: u8) -> Vec<(Move, Option<Promotion>, u64)> {
    let mut root = ScopedMove::root(state);
    let moves = root.all_legal_moves(root.turn);
    let mut results = Vec::new();

    for mv in moves.iter() {
        let promotes = root.is_promotion_move(*mv);
        for &choice in choices(&root, *mv) {
            let Ok(mut child) = root.nest_with(*mv, choice) else {
                continue;
            };
            let nodes = count_nodes(&mut child, depth.saturating_sub(1));
            results.push((*mv, promotes.then_some(choice), nodes));
        }
    }

    results
}

/// Performs perft test with detailed statistics.
pub fn perft_detailed(state: &mut GameState, depth: u8) -> PerftResults {
    detailed_nodes(&mut ScopedMove::root(state), depth)
}

fn detailed_nodes(node: &mut ScopedMove<'_>, depth: u8) -> PerftResults {
    let mut results = PerftResults::default();

    if depth == 0 {
        results.nodes = 1;
        return results;
    }

    let moves = node.all_legal_moves(node.turn);

    for mv in moves.iter() {
        for &choice in choices(node, *mv) {
            let Ok(mut child) = node.nest_with(*mv, choice) else {
                continue;
            };

            if depth == 1 {
                results.nodes += 1;

                // Classify the move from its history record
                if let Some(entry) = child.history().last() {
                    if entry.captured.is_some() {
                        results.captures += 1;
                    }
                    if entry.en_passant_capture {
                        results.en_passants += 1;
                    }
                    if entry.is_castle() {
                        results.castles += 1;
                    }
                    if entry.is_promotion() {
                        results.promotions += 1;
                    }
                }

                if child.is_in_check(child.turn) {
                    results.checks += 1;
                    if child.status().winner().is_some() {
                        results.checkmates += 1;
                    }
                }
            } else {
                let child_results = detailed_nodes(&mut child, depth - 1);
                results.add(&child_results);
            }
        }
    }

    results
}

/// Standard perft positions with expected results.
pub mod positions {
    /// Starting position perft values.
    pub const STARTING_POSITION: &[(u8, u64)] = &[
        (1, 20),
        (2, 400),
        (3, 8902),
        (4, 197_281),
        (5, 4_865_609),
    ];

    /// Kiwipete: castling, en passant and pins all in play.
    pub const KIWIPETE_PERFT: &[(u8, u64)] = &[(1, 48), (2, 2039), (3, 97_862)];

    /// Position 3 from CPW, heavy on en passant and rook checks.
    pub const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
    pub const POSITION_3_PERFT: &[(u8, u64)] = &[(1, 14), (2, 191), (3, 2812), (4, 43_238)];

    /// Position 4 from CPW, with promotions on the first move.
    pub const POSITION_4: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
    pub const POSITION_4_PERFT: &[(u8, u64)] = &[(1, 6), (2, 264), (3, 9467)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen;

    #[test]
    fn test_perft_starting_position() {
        let mut state = GameState::new();

        // Only test depths 1-3 to avoid timeout
        for &(depth, expected) in &positions::STARTING_POSITION[..3] {
            let result = perft(&mut state, depth);
            assert_eq!(
                result, expected,
                "Perft({}) failed: expected {}, got {}",
                depth, expected, result
            );
        }
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn test_perft_kiwipete() {
        let mut state = GameState::from_fen(fen::positions::KIWIPETE).unwrap();
        for &(depth, expected) in &positions::KIWIPETE_PERFT[..2] {
            assert_eq!(perft(&mut state, depth), expected, "depth {depth}");
        }
    }

    #[test]
    fn test_perft_position_3() {
        let mut state = GameState::from_fen(positions::POSITION_3).unwrap();
        for &(depth, expected) in &positions::POSITION_3_PERFT[..3] {
            assert_eq!(perft(&mut state, depth), expected, "depth {depth}");
        }
    }

    #[test]
    fn test_perft_position_4_promotions() {
        let mut state = GameState::from_fen(positions::POSITION_4).unwrap();
        for &(depth, expected) in &positions::POSITION_4_PERFT[..2] {
            assert_eq!(perft(&mut state, depth), expected, "depth {depth}");
        }
    }

    #[test]
    fn test_perft_divide() {
        let mut state = GameState::new();
        let results = perft_divide(&mut state, 1);

        assert_eq!(results.len(), 20);
        assert_eq!(results.iter().map(|(_, _, n)| n).sum::<u64>(), 20);
        assert!(results.iter().all(|(_, promotion, _)| promotion.is_none()));
    }

    #[test]
    fn test_perft_detailed_kiwipete() {
        let mut state = GameState::from_fen(fen::positions::KIWIPETE).unwrap();
        let results = perft_detailed(&mut state, 1);

        assert_eq!(results.nodes, 48);
        assert_eq!(results.captures, 8);
        assert_eq!(results.castles, 2);
        assert_eq!(results.en_passants, 0);
    }
}
