//! Mailbox board representation: one optional piece per square.

use crate::types::*;

pub(crate) const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// Array-based board representation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Board {
    /// 64 squares, indexed by Square::index()
    squares: [Option<Piece>; 64],
}

impl Board {
    /// Creates an empty board.
    pub const fn empty() -> Self {
        Self {
            squares: [None; 64],
        }
    }

    /// Creates the standard starting position with every piece unmoved.
    pub fn starting_position() -> Self {
        let mut board = Self::empty();

        for (file_idx, &piece_type) in BACK_RANK.iter().enumerate() {
            let Some(file) = File::new(file_idx as u8) else {
                continue;
            };
            for color in [Color::White, Color::Black] {
                board.set_piece(
                    Square::new(file, color.back_rank()),
                    Some(Piece::new(piece_type, color)),
                );
                board.set_piece(
                    Square::new(file, color.pawn_rank()),
                    Some(Piece::new(PieceType::Pawn, color)),
                );
            }
        }

        board
    }

    /// Gets the piece at the given square.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index() as usize]
    }

    /// Sets the piece at the given square.
    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.index() as usize] = piece;
    }

    /// Removes and returns the piece at the given square.
    pub fn take(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index() as usize].take()
    }

    /// Moves a piece from one square to another.
    /// Returns the captured piece, if any.
    pub fn move_piece(&mut self, from: Square, to: Square) -> Option<Piece> {
        let piece = self.take(from);
        std::mem::replace(&mut self.squares[to.index() as usize], piece)
    }

    /// Returns true if the given square is empty.
    pub fn is_empty(&self, square: Square) -> bool {
        self.piece_at(square).is_none()
    }

    /// Returns true if the given square contains a piece of the given color.
    pub fn is_color(&self, square: Square, color: Color) -> bool {
        self.piece_at(square).is_some_and(|p| p.color == color)
    }

    /// Returns true if the given square contains an enemy piece.
    pub fn is_enemy(&self, square: Square, color: Color) -> bool {
        self.piece_at(square)
            .is_some_and(|p| p.color == color.opponent())
    }

    /// Finds the king square for the given color.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color)
            .find(|(_, piece)| piece.piece_type == PieceType::King)
            .map(|(square, _)| square)
    }

    /// Iterates the pieces of one color in grid order (rank 8 first).
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.occupied().filter(move |(_, piece)| piece.color == color)
    }

    /// Iterates every occupied square in grid order (rank 8 first).
    pub fn occupied(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::grid_order().filter_map(|square| self.piece_at(square).map(|p| (square, p)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_starting_position() {
        let board = Board::starting_position();

        assert_eq!(
            board.piece_at(sq("a1")),
            Some(Piece::new(PieceType::Rook, Color::White))
        );
        assert_eq!(board.king_square(Color::White), Some(sq("e1")));
        assert_eq!(board.king_square(Color::Black), Some(sq("e8")));
        assert_eq!(
            board.piece_at(sq("d8")),
            Some(Piece::new(PieceType::Queen, Color::Black))
        );
        assert!(board.piece_at(sq("d5")).is_none());
        assert_eq!(board.pieces(Color::White).count(), 16);
        assert_eq!(board.occupied().count(), 32);
    }

    #[test]
    fn test_move_piece() {
        let mut board = Board::starting_position();

        let captured = board.move_piece(sq("e2"), sq("e4"));
        assert!(captured.is_none());
        assert!(board.piece_at(sq("e2")).is_none());
        assert_eq!(
            board.piece_at(sq("e4")),
            Some(Piece::new(PieceType::Pawn, Color::White))
        );

        let captured = board.move_piece(sq("e4"), sq("e7"));
        assert_eq!(captured, Some(Piece::new(PieceType::Pawn, Color::Black)));
    }

    #[test]
    fn test_missing_king() {
        let board = Board::empty();
        assert_eq!(board.king_square(Color::White), None);
    }
}
