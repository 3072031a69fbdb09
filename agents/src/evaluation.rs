use chess_core::{Color, GameState, PieceType, Square};

/// Centipawn value of a piece. Kings carry no material weight.
pub const fn piece_value(piece_type: PieceType) -> i32 {
    match piece_type {
        PieceType::Pawn => 100,
        PieceType::Knight => 320,
        PieceType::Bishop => 330,
        PieceType::Rook => 500,
        PieceType::Queen => 900,
        PieceType::King => 0,
    }
}

/// Knight placement bonus, indexed by rank relative to the knight's own side
/// (0 = its back rank) and file.
#[rustfmt::skip]
const KNIGHT_TABLE: [[i32; 8]; 8] = [
    [-50, -40, -30, -30, -30, -30, -40, -50],
    [-40, -20,   0,   5,   5,   0, -20, -40],
    [-30,   5,  10,  15,  15,  10,   5, -30],
    [-30,   0,  15,  20,  20,  15,   0, -30],
    [-30,   5,  15,  20,  20,  15,   5, -30],
    [-30,   0,  10,  15,  15,  10,   0, -30],
    [-40, -20,   0,   0,   0,   0, -20, -40],
    [-50, -40, -30, -30, -30, -30, -40, -50],
];

fn knight_bonus(square: Square, color: Color) -> i32 {
    let rank = square.rank().index() as usize;
    let relative_rank = match color {
        Color::White => rank,
        Color::Black => 7 - rank,
    };
    KNIGHT_TABLE[relative_rank][square.file().index() as usize]
}

/// Static position evaluator used at search leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluator {
    knight_table: bool,
}

impl Evaluator {
    /// Material only.
    pub const MATERIAL: Evaluator = Evaluator {
        knight_table: false,
    };

    /// Material plus the knight centrality table.
    pub const WITH_KNIGHT_TABLE: Evaluator = Evaluator { knight_table: true };

    pub fn uses_knight_table(&self) -> bool {
        self.knight_table
    }

    /// Evaluates the position in centipawns from `color`'s point of view.
    pub fn evaluate(&self, state: &GameState, color: Color) -> i32 {
        state
            .board
            .occupied()
            .map(|(square, piece)| {
                let mut score = piece_value(piece.piece_type);
                if self.knight_table && piece.piece_type == PieceType::Knight {
                    score += knight_bonus(square, piece.color);
                }
                if piece.color == color {
                    score
                } else {
                    -score
                }
            })
            .sum()
    }
}

/// Material balance in centipawns from `color`'s point of view.
pub fn material_balance(state: &GameState, color: Color) -> i32 {
    Evaluator::MATERIAL.evaluate(state, color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Piece;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_starting_position_is_balanced() {
        let state = GameState::new();
        assert_eq!(material_balance(&state, Color::White), 0);
        assert_eq!(Evaluator::WITH_KNIGHT_TABLE.evaluate(&state, Color::Black), 0);
    }

    #[test]
    fn test_material_perspective() {
        let mut state = GameState::new();
        state.board.set_piece(sq("d8"), None);

        assert_eq!(material_balance(&state, Color::White), 900);
        assert_eq!(material_balance(&state, Color::Black), -900);
    }

    #[test]
    fn test_knight_table_prefers_center() {
        let mut rim = GameState::empty();
        rim.board
            .set_piece(sq("a1"), Some(Piece::new(PieceType::Knight, Color::White)));
        let mut center = GameState::empty();
        center
            .board
            .set_piece(sq("e4"), Some(Piece::new(PieceType::Knight, Color::White)));

        let eval = Evaluator::WITH_KNIGHT_TABLE;
        assert_eq!(eval.evaluate(&rim, Color::White), 320 - 50);
        assert_eq!(eval.evaluate(&center, Color::White), 320 + 20);
        assert_eq!(Evaluator::MATERIAL.evaluate(&rim, Color::White), 320);
    }

    #[test]
    fn test_knight_table_mirrors_for_black() {
        let mut state = GameState::empty();
        state
            .board
            .set_piece(sq("b1"), Some(Piece::new(PieceType::Knight, Color::White)));
        state
            .board
            .set_piece(sq("b8"), Some(Piece::new(PieceType::Knight, Color::Black)));

        assert_eq!(Evaluator::WITH_KNIGHT_TABLE.evaluate(&state, Color::White), 0);
    }
}
