//! Error types for board commands.
//!
//! Every variant is a local, recoverable failure: the state is left exactly as
//! it was before the rejected command.

use thiserror::Error;

use crate::types::{PieceType, Square};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// Malformed coordinate text, rejected before touching the board.
    #[error("invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("invalid piece name: {0:?}")]
    InvalidPiece(String),

    #[error("no piece at {0}")]
    NoPieceAtSquare(Square),

    #[error("expected a {expected} at {square}, found a {found}")]
    WrongPieceType {
        square: Square,
        expected: PieceType,
        found: PieceType,
    },

    /// Well-formed but not in the legal move set.
    #[error("illegal move {from}{to}")]
    IllegalMove { from: Square, to: Square },

    #[error("promotion pending at {0}")]
    PromotionPending(Square),

    #[error("no promotion pending")]
    NoPendingPromotion,

    #[error("invalid promotion choice {0:?}")]
    InvalidPromotion(char),

    #[error("no move to undo")]
    EmptyHistory,
}

pub type ChessResult<T> = Result<T, ChessError>;
