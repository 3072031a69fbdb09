//! Undo records for applied half-moves.
//!
//! One [`HistoryEntry`] is pushed per successful `apply_move` and popped by
//! `undo_last_move`. Entries carry enough pre-move state to restore the game
//! exactly, including `moved` flags and capture scores.

use crate::types::{Color, Piece, PieceType, Square};

/// Rook relocation performed as part of castling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CastleRecord {
    pub rook_from: Square,
    pub rook_to: Square,
    /// Rook as it stood before castling, including its prior `moved` flag.
    pub rook: Piece,
}

/// Promotion progress for a pawn that reached its last rank.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PromotionRecord {
    /// The pawn sits on the last rank awaiting a choice; turn has not switched.
    Pending,
    /// The pawn was replaced by the given piece and turn switched.
    Resolved(PieceType),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HistoryEntry {
    pub from: Square,
    pub to: Square,
    /// Moving piece as it stood before the move.
    pub piece: Piece,
    /// Captured piece and the square it was removed from. For en passant this
    /// is the square behind the destination.
    pub captured: Option<(Square, Piece)>,
    pub prev_en_passant: Option<Square>,
    pub prev_turn: Color,
    pub castle: Option<CastleRecord>,
    pub en_passant_capture: bool,
    pub promotion: Option<PromotionRecord>,
    /// Points added to the mover's score by this move.
    pub capture_points: u32,
}

impl HistoryEntry {
    pub fn is_castle(&self) -> bool {
        self.castle.is_some()
    }

    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }
}
