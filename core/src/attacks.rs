//! Square-attack queries on a bare board.
//!
//! Attacks are raw patterns: pawns attack diagonally only, kings never castle,
//! and nothing is filtered for check. The legality filter calls these on a
//! simulated board, so they must not depend on legal move generation.

use crate::board::Board;
use crate::types::{Color, PieceType, Square};

pub(crate) const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub(crate) const KING_DELTAS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub(crate) const DIAGONAL_DIRS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
pub(crate) const STRAIGHT_DIRS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

impl Board {
    /// Returns true if any piece of `attacker` attacks `square`.
    pub fn is_attacked_by(&self, square: Square, attacker: Color) -> bool {
        self.is_pawn_attacked(square, attacker)
            || self.has_piece_at_offsets(square, attacker, PieceType::Knight, &KNIGHT_DELTAS)
            || self.is_slider_attacked(square, attacker)
            || self.has_piece_at_offsets(square, attacker, PieceType::King, &KING_DELTAS)
    }

    /// Returns true if the given square is attacked by enemy pawns.
    fn is_pawn_attacked(&self, square: Square, attacker: Color) -> bool {
        // Attacking pawns stand one rank behind the target from their own side.
        let dr = -attacker.pawn_direction();
        [-1, 1].iter().any(|&df| {
            square
                .offset(df, dr)
                .and_then(|from| self.piece_at(from))
                .is_some_and(|p| p.color == attacker && p.piece_type == PieceType::Pawn)
        })
    }

    fn has_piece_at_offsets(
        &self,
        square: Square,
        attacker: Color,
        piece_type: PieceType,
        deltas: &[(i8, i8)],
    ) -> bool {
        deltas.iter().any(|&(df, dr)| {
            square
                .offset(df, dr)
                .and_then(|from| self.piece_at(from))
                .is_some_and(|p| p.color == attacker && p.piece_type == piece_type)
        })
    }

    /// Returns true if the given square is attacked by enemy sliding pieces.
    fn is_slider_attacked(&self, square: Square, attacker: Color) -> bool {
        DIAGONAL_DIRS
            .iter()
            .any(|&(df, dr)| self.is_attacked_along_ray(square, df, dr, attacker, true))
            || STRAIGHT_DIRS
                .iter()
                .any(|&(df, dr)| self.is_attacked_along_ray(square, df, dr, attacker, false))
    }

    /// Checks if a square is attacked along a ray.
    fn is_attacked_along_ray(
        &self,
        square: Square,
        df: i8,
        dr: i8,
        attacker: Color,
        diagonal: bool,
    ) -> bool {
        let mut current = square;

        while let Some(next) = current.offset(df, dr) {
            current = next;
            if let Some(piece) = self.piece_at(current) {
                // First piece on the ray blocks everything behind it.
                return piece.color == attacker
                    && match piece.piece_type {
                        PieceType::Queen => true,
                        PieceType::Bishop => diagonal,
                        PieceType::Rook => !diagonal,
                        _ => false,
                    };
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Piece;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_knight_and_king_attacks() {
        let mut board = Board::empty();
        board.set_piece(sq("g1"), Some(Piece::new(PieceType::Knight, Color::White)));
        board.set_piece(sq("a8"), Some(Piece::new(PieceType::King, Color::Black)));

        assert!(board.is_attacked_by(sq("f3"), Color::White));
        assert!(board.is_attacked_by(sq("e2"), Color::White));
        assert!(!board.is_attacked_by(sq("g3"), Color::White));
        assert!(board.is_attacked_by(sq("b7"), Color::Black));
        assert!(!board.is_attacked_by(sq("c6"), Color::Black));
    }

    #[test]
    fn test_queen_covers_both_ray_kinds() {
        let mut board = Board::empty();
        board.set_piece(sq("d4"), Some(Piece::new(PieceType::Queen, Color::Black)));

        assert!(board.is_attacked_by(sq("h8"), Color::Black));
        assert!(board.is_attacked_by(sq("d1"), Color::Black));
        assert!(!board.is_attacked_by(sq("e6"), Color::Black));
        assert!(!board.is_attacked_by(sq("h8"), Color::White));
    }
}
