use std::fmt;
use std::str::FromStr;

use crate::error::ChessError;

/// Represents one of the two players in chess.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Returns the opposite color.
    pub const fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Returns the starting rank for pawns of this color.
    pub const fn pawn_rank(self) -> Rank {
        match self {
            Color::White => Rank::SECOND,
            Color::Black => Rank::SEVENTH,
        }
    }

    /// Returns the promotion rank for pawns of this color.
    pub const fn promotion_rank(self) -> Rank {
        match self {
            Color::White => Rank::EIGHTH,
            Color::Black => Rank::FIRST,
        }
    }

    /// Returns the rank the king and rooks start on.
    pub const fn back_rank(self) -> Rank {
        match self {
            Color::White => Rank::FIRST,
            Color::Black => Rank::EIGHTH,
        }
    }

    /// Returns the direction pawns of this color move.
    pub const fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// The six types of chess pieces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    /// Points credited to the capturing side when a piece of this type is taken.
    pub const fn capture_value(self) -> u32 {
        match self {
            PieceType::Pawn => 1,
            PieceType::Knight => 3,
            PieceType::Bishop => 3,
            PieceType::Rook => 5,
            PieceType::Queen => 9,
            PieceType::King => 0,
        }
    }

    /// Lowercase letter used in FEN and move notation.
    pub const fn letter(self) -> char {
        match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        }
    }

    /// Parses a piece letter in either case.
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceType::Pawn => "pawn",
            PieceType::Knight => "knight",
            PieceType::Bishop => "bishop",
            PieceType::Rook => "rook",
            PieceType::Queen => "queen",
            PieceType::King => "king",
        };
        f.write_str(name)
    }
}

/// Accepts full names ("knight") or single letters ("n"), case-insensitive.
impl FromStr for PieceType {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let parsed = match lower.as_str() {
            "pawn" => Some(PieceType::Pawn),
            "knight" => Some(PieceType::Knight),
            "bishop" => Some(PieceType::Bishop),
            "rook" => Some(PieceType::Rook),
            "queen" => Some(PieceType::Queen),
            "king" => Some(PieceType::King),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => PieceType::from_char(c),
                    _ => None,
                }
            }
        };
        parsed.ok_or_else(|| ChessError::InvalidPiece(s.to_string()))
    }
}

/// The pieces a pawn may promote to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub const ALL: [Promotion; 4] = [
        Promotion::Queen,
        Promotion::Rook,
        Promotion::Bishop,
        Promotion::Knight,
    ];

    pub const fn piece_type(self) -> PieceType {
        match self {
            Promotion::Queen => PieceType::Queen,
            Promotion::Rook => PieceType::Rook,
            Promotion::Bishop => PieceType::Bishop,
            Promotion::Knight => PieceType::Knight,
        }
    }

    /// Parses a promotion letter (q, r, b, n) in either case.
    pub fn from_char(c: char) -> Result<Self, ChessError> {
        match c.to_ascii_lowercase() {
            'q' => Ok(Promotion::Queen),
            'r' => Ok(Promotion::Rook),
            'b' => Ok(Promotion::Bishop),
            'n' => Ok(Promotion::Knight),
            _ => Err(ChessError::InvalidPromotion(c)),
        }
    }
}

/// A chess piece with type, color and whether it has ever left its square.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
    /// Set whenever the piece relocates. Castling eligibility reads only this.
    pub moved: bool,
}

impl Piece {
    /// Creates an unmoved piece with the given type and color.
    pub const fn new(piece_type: PieceType, color: Color) -> Self {
        Self {
            piece_type,
            color,
            moved: false,
        }
    }

    /// Returns a copy of this piece marked as moved.
    pub const fn marked_moved(self) -> Self {
        Self {
            moved: true,
            ..self
        }
    }

    /// FEN letter: uppercase for white, lowercase for black.
    pub const fn to_char(self) -> char {
        let c = self.piece_type.letter();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// Parses a FEN letter. The piece is returned unmoved.
    pub const fn from_char(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        match PieceType::from_char(c) {
            Some(piece_type) => Some(Piece::new(piece_type, color)),
            None => None,
        }
    }
}

/// A file on the chess board (a-h).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct File(u8);

impl File {
    pub const A: File = File(0);
    pub const B: File = File(1);
    pub const C: File = File(2);
    pub const D: File = File(3);
    pub const E: File = File(4);
    pub const F: File = File(5);
    pub const G: File = File(6);
    pub const H: File = File(7);

    /// Creates a new file from index (0-7).
    /// Returns None if index is out of range.
    pub const fn new(index: u8) -> Option<Self> {
        if index < 8 {
            Some(File(index))
        } else {
            None
        }
    }

    /// Creates a file from a character ('a'-'h').
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='h' => Some(File(c as u8 - b'a')),
            _ => None,
        }
    }

    /// Returns the file as a character ('a'-'h').
    pub const fn to_char(self) -> char {
        (b'a' + self.0) as char
    }

    /// Returns the file index (0-7).
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the adjacent file in the given direction, if valid.
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let new_file = self.0 as i8 + delta;
        if new_file >= 0 && new_file < 8 {
            Some(File(new_file as u8))
        } else {
            None
        }
    }
}

/// A rank on the chess board (1-8).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Rank(u8);

impl Rank {
    pub const FIRST: Rank = Rank(0);
    pub const SECOND: Rank = Rank(1);
    pub const THIRD: Rank = Rank(2);
    pub const SIXTH: Rank = Rank(5);
    pub const SEVENTH: Rank = Rank(6);
    pub const EIGHTH: Rank = Rank(7);

    /// Creates a new rank from index (0-7).
    /// Returns None if index is out of range.
    pub const fn new(index: u8) -> Option<Self> {
        if index < 8 {
            Some(Rank(index))
        } else {
            None
        }
    }

    /// Creates a rank from a digit ('1'-'8').
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '1'..='8' => Some(Rank(c as u8 - b'1')),
            _ => None,
        }
    }

    /// Returns the rank as a character ('1'-'8').
    pub const fn to_char(self) -> char {
        (b'1' + self.0) as char
    }

    /// Returns the rank index (0-7).
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the adjacent rank in the given direction, if valid.
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let new_rank = self.0 as i8 + delta;
        if new_rank >= 0 && new_rank < 8 {
            Some(Rank(new_rank as u8))
        } else {
            None
        }
    }
}

/// A square on the chess board, a1 = 0 through h8 = 63.
///
/// The grid view uses `row` 0 for rank 8 and `row` 7 for rank 1, so that
/// iterating rows top to bottom visits the board the way it is printed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Square(u8);

impl Square {
    pub const A1: Square = Square(0);

    /// Creates a new square from file and rank.
    pub const fn new(file: File, rank: Rank) -> Self {
        Square(rank.0 * 8 + file.0)
    }

    /// Creates a square from index (0-63).
    /// Returns None if index is out of range.
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    /// Creates a square from grid coordinates (row 0 = rank 8).
    pub const fn from_coords(row: u8, col: u8) -> Option<Self> {
        if row < 8 && col < 8 {
            Some(Square((7 - row) * 8 + col))
        } else {
            None
        }
    }

    /// All 64 squares in grid order: row 0 (rank 8) first, a-file to h-file.
    pub fn grid_order() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Square((7 - row) * 8 + col)))
    }

    /// Returns the file of this square.
    pub const fn file(self) -> File {
        File(self.0 % 8)
    }

    /// Returns the rank of this square.
    pub const fn rank(self) -> Rank {
        Rank(self.0 / 8)
    }

    pub const fn row(self) -> u8 {
        7 - self.0 / 8
    }

    pub const fn col(self) -> u8 {
        self.0 % 8
    }

    /// Returns the square index (0-63).
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the square shifted by file and rank deltas, if still on the board.
    pub const fn offset(self, df: i8, dr: i8) -> Option<Self> {
        match (self.file().offset(df), self.rank().offset(dr)) {
            (Some(file), Some(rank)) => Some(Square::new(file, rank)),
            _ => None,
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file().to_char(), self.rank().to_char())
    }
}

impl FromStr for Square {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => match (File::from_char(f), Rank::from_char(r)) {
                (Some(file), Some(rank)) => Ok(Square::new(file, rank)),
                _ => Err(ChessError::InvalidSquare(s.to_string())),
            },
            _ => Err(ChessError::InvalidSquare(s.to_string())),
        }
    }
}

/// A half-move expressed as origin and destination.
///
/// Castling is a king move of two files; promotion is resolved separately.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub const fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// Parses coordinate notation such as "e2e4".
impl FromStr for Move {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.is_ascii() {
            return Err(ChessError::InvalidSquare(s.to_string()));
        }
        Ok(Move::new(s[..2].parse()?, s[2..].parse()?))
    }
}
