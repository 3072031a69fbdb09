//! Complete game state: board, side to move, en passant target, pending
//! promotion, capture scores and the undo stack.

use std::fmt;

use crate::board::*;
use crate::history::HistoryEntry;
use crate::types::*;

/// A pawn waiting on the last rank for its promotion choice.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PendingPromotion {
    pub square: Square,
    pub color: Color,
}

/// Cumulative capture points per side.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Scores {
    pub white: u32,
    pub black: u32,
}

impl Scores {
    pub fn get(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub(crate) fn get_mut(&mut self, color: Color) -> &mut u32 {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// White's points minus Black's points.
    pub fn diff(&self) -> i32 {
        self.white as i32 - self.black as i32
    }
}

/// Material on the board, counted with capture values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Material {
    pub white: u32,
    pub black: u32,
}

impl Material {
    pub fn diff(&self) -> i32 {
        self.white as i32 - self.black as i32
    }
}

/// Result of the game-state detector for one side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate { winner: Color },
    Stalemate,
}

impl GameStatus {
    pub fn winner(self) -> Option<Color> {
        match self {
            GameStatus::Checkmate { winner } => Some(winner),
            _ => None,
        }
    }

    /// True for checkmate and stalemate.
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Stalemate)
    }

    pub fn is_check(self) -> bool {
        matches!(self, GameStatus::Check | GameStatus::Checkmate { .. })
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => f.write_str("ongoing"),
            GameStatus::Check => f.write_str("check"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate ({winner} wins)"),
            GameStatus::Stalemate => f.write_str("stalemate"),
        }
    }
}

/// Complete state of a chess game.
///
/// Mutated in place by the mover; every applied half-move pushes a
/// [`HistoryEntry`] so it can be undone exactly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameState {
    /// The current board position
    pub board: Board,
    /// Which side is to move
    pub turn: Color,
    /// En passant target square, valid for the next half-move only
    pub en_passant: Option<Square>,
    pub(crate) pending_promotion: Option<PendingPromotion>,
    pub(crate) scores: Scores,
    pub(crate) history: Vec<HistoryEntry>,
}

impl GameState {
    /// Creates a new game in the starting position.
    pub fn new() -> Self {
        Self {
            board: Board::starting_position(),
            ..Self::empty()
        }
    }

    /// Creates an empty game state for setting up positions.
    pub fn empty() -> Self {
        Self {
            board: Board::empty(),
            turn: Color::White,
            en_passant: None,
            pending_promotion: None,
            scores: Scores::default(),
            history: Vec::new(),
        }
    }

    /// Gets the piece at the given square.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.piece_at(square)
    }

    pub fn pending_promotion(&self) -> Option<PendingPromotion> {
        self.pending_promotion
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    /// Applied half-moves, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|h| Move::new(h.from, h.to))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.board.king_square(color)
    }

    /// Returns true if the given square is attacked by the given color.
    pub fn is_attacked_by(&self, square: Square, attacker: Color) -> bool {
        self.board.is_attacked_by(square, attacker)
    }

    /// Returns true if the given side's king is attacked.
    /// A side without a king is never in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|king| self.is_attacked_by(king, color.opponent()))
    }

    /// Derives the game state for `color` from "in check" and "has a legal move".
    pub fn detect_state(&self, color: Color) -> GameStatus {
        let in_check = self.is_in_check(color);
        let has_move = self.has_any_legal_move(color);

        match (in_check, has_move) {
            (true, false) => GameStatus::Checkmate {
                winner: color.opponent(),
            },
            (false, false) => GameStatus::Stalemate,
            (true, true) => GameStatus::Check,
            (false, true) => GameStatus::Ongoing,
        }
    }

    /// Game state for the side to move.
    pub fn status(&self) -> GameStatus {
        self.detect_state(self.turn)
    }

    /// Counts material on the board with capture values.
    pub fn material(&self) -> Material {
        self.board
            .occupied()
            .fold(Material::default(), |mut material, (_, piece)| {
                let value = piece.piece_type.capture_value();
                match piece.color {
                    Color::White => material.white += value,
                    Color::Black => material.black += value,
                }
                material
            })
    }

    /// The grid as FEN letters, row 0 being rank 8.
    pub fn board_rows(&self) -> [[Option<char>; 8]; 8] {
        let mut rows = [[None; 8]; 8];
        for square in Square::grid_order() {
            rows[square.row() as usize][square.col() as usize] =
                self.board.piece_at(square).map(Piece::to_char);
        }
        rows
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
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
        let state = GameState::new();
        assert_eq!(state.turn, Color::White);
        assert!(state.en_passant.is_none());
        assert!(state.pending_promotion().is_none());
        assert_eq!(state.scores(), Scores::default());
        assert_eq!(state.status(), GameStatus::Ongoing);
        assert_eq!(state.material(), Material { white: 39, black: 39 });
    }

    #[test]
    fn test_board_rows() {
        let rows = GameState::new().board_rows();
        assert_eq!(rows[7][4], Some('K'));
        assert_eq!(rows[0][4], Some('k'));
        assert_eq!(rows[4][4], None);
    }

    #[test]
    fn test_is_attacked() {
        let mut state = GameState::empty();

        state
            .board
            .set_piece(sq("e4"), Some(Piece::new(PieceType::Rook, Color::White)));

        assert!(state.is_attacked_by(sq("e1"), Color::White));
        assert!(state.is_attacked_by(sq("e8"), Color::White));
        assert!(state.is_attacked_by(sq("a4"), Color::White));
        assert!(state.is_attacked_by(sq("h4"), Color::White));
        assert!(!state.is_attacked_by(sq("d5"), Color::White));
    }

    #[test]
    fn test_pawn_attacks_diagonally_only() {
        let mut state = GameState::empty();
        state
            .board
            .set_piece(sq("e4"), Some(Piece::new(PieceType::Pawn, Color::White)));
        state
            .board
            .set_piece(sq("d6"), Some(Piece::new(PieceType::Pawn, Color::Black)));

        assert!(state.is_attacked_by(sq("d5"), Color::White));
        assert!(state.is_attacked_by(sq("f5"), Color::White));
        assert!(!state.is_attacked_by(sq("e5"), Color::White));
        assert!(state.is_attacked_by(sq("e5"), Color::Black));
        assert!(state.is_attacked_by(sq("c5"), Color::Black));
        assert!(!state.is_attacked_by(sq("d5"), Color::Black));
    }

    #[test]
    fn test_blocked_ray() {
        let mut state = GameState::empty();
        state
            .board
            .set_piece(sq("a1"), Some(Piece::new(PieceType::Bishop, Color::Black)));
        state
            .board
            .set_piece(sq("c3"), Some(Piece::new(PieceType::Knight, Color::White)));

        assert!(state.is_attacked_by(sq("b2"), Color::Black));
        assert!(state.is_attacked_by(sq("c3"), Color::Black));
        assert!(!state.is_attacked_by(sq("d4"), Color::Black));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            GameStatus::Checkmate {
                winner: Color::Black
            }
            .to_string(),
            "checkmate (black wins)"
        );
        assert_eq!(GameStatus::Stalemate.winner(), None);
        assert!(GameStatus::Stalemate.is_over());
        assert!(!GameStatus::Check.is_over());
        assert!(GameStatus::Check.is_check());
        assert!(GameStatus::Checkmate {
            winner: Color::White
        }
        .is_check());
        assert!(!GameStatus::Stalemate.is_check());
        assert!(!GameStatus::Ongoing.is_check());
    }
}
