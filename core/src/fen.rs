//! FEN (Forsyth-Edwards Notation) snapshots of a game state.
//!
//! Castling rights are not stored: they are derived from the `moved` flags of
//! kings and rooks on export, and turned back into flags on import. The move
//! counters are not tracked and always export as "0 1".

use thiserror::Error;

use crate::board::BACK_RANK;
use crate::game_state::GameState;
use crate::types::{Color, File, Piece, PieceType, Rank, Square};

/// FEN parsing error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("invalid FEN format: {0}")]
    InvalidFormat(String),

    #[error("invalid piece character: '{0}'")]
    InvalidPiece(char),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid castling rights: {0}")]
    InvalidCastling(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassant(String),
}

/// One side's castling availability as read from or written to FEN.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct CastlingFlags {
    kingside: bool,
    queenside: bool,
}

impl GameState {
    /// Parses a FEN string into a game state.
    ///
    /// The board, side to move, castling and en passant fields are required;
    /// trailing move counters are accepted and ignored. Moved flags are
    /// inferred: a king or rook is unmoved only when a castling right needs
    /// it, and any other piece is unmoved only on its starting square.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if !(4..=6).contains(&parts.len()) {
            return Err(FenError::InvalidFormat(format!(
                "expected 4 to 6 fields, got {}",
                parts.len()
            )));
        }

        let mut state = GameState::empty();
        parse_board(&mut state, parts[0])?;

        state.turn = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidColor(other.to_string())),
        };

        let (white, black) = parse_castling(parts[2])?;
        apply_castling_flags(&mut state, Color::White, white);
        apply_castling_flags(&mut state, Color::Black, black);

        state.en_passant = parse_en_passant(parts[3])?;

        Ok(state)
    }

    /// Converts the game state to a FEN string.
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {} {} 0 1",
            board_to_fen(self),
            if self.turn == Color::White { "w" } else { "b" },
            castling_to_fen(self),
            match self.en_passant {
                Some(square) => square.to_string(),
                None => "-".to_string(),
            }
        )
    }
}

/// Parses the placement field. Pieces off their starting squares are marked
/// moved; kings and rooks always are, until castling flags unmark them.
fn parse_board(state: &mut GameState, board_str: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = board_str.split('/').collect();

    if ranks.len() != 8 {
        return Err(FenError::InvalidFormat(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    for (row, rank_str) in ranks.iter().enumerate() {
        let mut col = 0u8;

        for ch in rank_str.chars() {
            match ch {
                '1'..='8' => {
                    col = col.saturating_add(ch as u8 - b'0');
                    continue;
                }
                '0' | '9' => {
                    return Err(FenError::InvalidFormat(format!(
                        "empty-square count {ch} in rank {}",
                        8 - row
                    )))
                }
                _ => {}
            }

            let square = Square::from_coords(row as u8, col).ok_or_else(|| {
                FenError::InvalidFormat(format!("too many squares in rank {}", 8 - row))
            })?;
            let piece = Piece::from_char(ch).ok_or(FenError::InvalidPiece(ch))?;
            let piece = if is_home_square(piece, square) {
                piece
            } else {
                piece.marked_moved()
            };

            state.board.set_piece(square, Some(piece));
            col += 1;
        }

        if col != 8 {
            return Err(FenError::InvalidFormat(format!(
                "rank {} has {} squares, expected 8",
                8 - row,
                col
            )));
        }
    }

    Ok(())
}

fn is_home_square(piece: Piece, square: Square) -> bool {
    match piece.piece_type {
        PieceType::Pawn => square.rank() == piece.color.pawn_rank(),
        PieceType::King | PieceType::Rook => false,
        piece_type => {
            square.rank() == piece.color.back_rank()
                && BACK_RANK[square.file().index() as usize] == piece_type
        }
    }
}

fn board_to_fen(state: &GameState) -> String {
    let rows: Vec<String> = state
        .board_rows()
        .iter()
        .map(|row| {
            let mut fen = String::new();
            let mut empty_count = 0;

            for cell in row {
                match cell {
                    Some(c) => {
                        if empty_count > 0 {
                            fen.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        fen.push(*c);
                    }
                    None => empty_count += 1,
                }
            }

            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            fen
        })
        .collect();

    rows.join("/")
}

fn parse_castling(castling_str: &str) -> Result<(CastlingFlags, CastlingFlags), FenError> {
    let mut white = CastlingFlags::default();
    let mut black = CastlingFlags::default();

    if castling_str == "-" {
        return Ok((white, black));
    }

    for ch in castling_str.chars() {
        match ch {
            'K' => white.kingside = true,
            'Q' => white.queenside = true,
            'k' => black.kingside = true,
            'q' => black.queenside = true,
            _ => return Err(FenError::InvalidCastling(castling_str.to_string())),
        }
    }

    Ok((white, black))
}

/// Clears the moved flag on the king and rook a granted right relies on.
fn apply_castling_flags(state: &mut GameState, color: Color, flags: CastlingFlags) {
    let rank = color.back_rank();
    let sides = [(flags.kingside, File::H), (flags.queenside, File::A)];

    for (granted, rook_file) in sides {
        if !granted {
            continue;
        }
        for (square, piece_type) in [
            (Square::new(File::E, rank), PieceType::King),
            (Square::new(rook_file, rank), PieceType::Rook),
        ] {
            if let Some(piece) = state.board.piece_at(square) {
                if piece.piece_type == piece_type && piece.color == color {
                    state.board.set_piece(square, Some(Piece::new(piece_type, color)));
                }
            }
        }
    }
}

/// A right exists while the king on e and the rook in the corner are unmoved.
fn castling_to_fen(state: &GameState) -> String {
    let mut s = String::new();

    for color in [Color::White, Color::Black] {
        let flags = side_castling(state, color);
        let (king_letter, queen_letter) = match color {
            Color::White => ('K', 'Q'),
            Color::Black => ('k', 'q'),
        };
        if flags.kingside {
            s.push(king_letter);
        }
        if flags.queenside {
            s.push(queen_letter);
        }
    }

    if s.is_empty() {
        "-".to_string()
    } else {
        s
    }
}

fn side_castling(state: &GameState, color: Color) -> CastlingFlags {
    let rank = color.back_rank();
    let unmoved = |file: File, piece_type: PieceType| {
        state
            .board
            .piece_at(Square::new(file, rank))
            .is_some_and(|p| p.piece_type == piece_type && p.color == color && !p.moved)
    };

    if !unmoved(File::E, PieceType::King) {
        return CastlingFlags::default();
    }

    CastlingFlags {
        kingside: unmoved(File::H, PieceType::Rook),
        queenside: unmoved(File::A, PieceType::Rook),
    }
}

fn parse_en_passant(ep_str: &str) -> Result<Option<Square>, FenError> {
    if ep_str == "-" {
        return Ok(None);
    }

    let square: Square = ep_str
        .parse()
        .map_err(|_| FenError::InvalidEnPassant(ep_str.to_string()))?;

    if square.rank() != Rank::THIRD && square.rank() != Rank::SIXTH {
        return Err(FenError::InvalidEnPassant(ep_str.to_string()));
    }

    Ok(Some(square))
}

/// Standard FEN positions for testing.
pub mod positions {
    /// Starting position.
    pub const STARTING: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Kiwipete position - good for testing complex positions.
    pub const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    /// Position after 1.e4 e5.
    pub const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 1";
}
