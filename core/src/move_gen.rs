use crate::attacks::{DIAGONAL_DIRS, KING_DELTAS, KNIGHT_DELTAS, STRAIGHT_DIRS};
use crate::game_state::GameState;
use crate::types::{Color, File, Move, Piece, PieceType, Square};

/// A list of moves with a fixed capacity to avoid allocations.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; 256], // Max possible moves in any position
    count: usize,
}

impl MoveList {
    /// Creates an empty move list.
    pub const fn new() -> Self {
        Self {
            moves: [Move::new(Square::A1, Square::A1); 256],
            count: 0,
        }
    }

    /// Adds a move to the list.
    pub fn push(&mut self, mv: Move) {
        debug_assert!(self.count < 256, "Move list overflow");
        self.moves[self.count] = mv;
        self.count += 1;
    }

    /// Returns the number of moves.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns an iterator over the moves.
    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.as_slice().iter()
    }

    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.count]
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.as_slice().contains(&mv)
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl GameState {
    /// Destinations the piece on `from` can reach by its movement pattern,
    /// without checking whether its own king is left in check.
    pub fn pseudo_moves(&self, from: Square) -> Vec<Square> {
        let Some(piece) = self.board.piece_at(from) else {
            return Vec::new();
        };
        let mut targets = Vec::with_capacity(28);
        let color = piece.color;

        match piece.piece_type {
            PieceType::Pawn => self.pawn_targets(from, color, &mut targets),
            PieceType::Knight => self.step_targets(from, color, &KNIGHT_DELTAS, &mut targets),
            PieceType::Bishop => self.sliding_targets(from, color, &DIAGONAL_DIRS, &mut targets),
            PieceType::Rook => self.sliding_targets(from, color, &STRAIGHT_DIRS, &mut targets),
            PieceType::Queen => {
                self.sliding_targets(from, color, &DIAGONAL_DIRS, &mut targets);
                self.sliding_targets(from, color, &STRAIGHT_DIRS, &mut targets);
            }
            PieceType::King => {
                self.step_targets(from, color, &KING_DELTAS, &mut targets);
                self.castling_targets(from, piece, &mut targets);
            }
        }

        targets
    }

    /// Pseudo-moves of the piece on `from` that keep its own king safe.
    pub fn legal_moves(&self, from: Square) -> Vec<Square> {
        let mut targets = self.pseudo_moves(from);
        targets.retain(|&to| self.is_legal(from, to));
        targets
    }

    /// Legal destinations for `square`, or nothing if the piece there is not a `piece_type`.
    pub fn legal_moves_for(&self, piece_type: PieceType, square: Square) -> Vec<Square> {
        match self.board.piece_at(square) {
            Some(piece) if piece.piece_type == piece_type => self.legal_moves(square),
            _ => Vec::new(),
        }
    }

    /// Every legal move of `color`, scanning the grid from rank 8 down.
    pub fn all_legal_moves(&self, color: Color) -> MoveList {
        let mut moves = MoveList::new();

        for (from, _) in self.board.pieces(color) {
            for to in self.legal_moves(from) {
                moves.push(Move::new(from, to));
            }
        }

        moves
    }

    /// Returns true as soon as one legal move for `color` is found.
    pub fn has_any_legal_move(&self, color: Color) -> bool {
        self.board.pieces(color).any(|(from, _)| {
            self.pseudo_moves(from)
                .into_iter()
                .any(|to| self.is_legal(from, to))
        })
    }

    /// Returns true if `mv` takes a pawn to its last rank.
    pub fn is_promotion_move(&self, mv: Move) -> bool {
        self.board.piece_at(mv.from).is_some_and(|p| {
            p.piece_type == PieceType::Pawn && mv.to.rank() == p.color.promotion_rank()
        })
    }

    /// Pawn pushes, double pushes, captures and en passant.
    fn pawn_targets(&self, from: Square, color: Color, targets: &mut Vec<Square>) {
        let direction = color.pawn_direction();

        // Single push, then double push from the starting rank
        if let Some(one) = from.offset(0, direction) {
            if self.board.is_empty(one) {
                targets.push(one);

                if from.rank() == color.pawn_rank() {
                    if let Some(two) = one.offset(0, direction) {
                        if self.board.is_empty(two) {
                            targets.push(two);
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            let Some(diagonal) = from.offset(df, direction) else {
                continue;
            };

            if self.board.is_enemy(diagonal, color) {
                targets.push(diagonal);
            } else if self.en_passant == Some(diagonal) {
                // The pawn that just double-stepped sits beside us on our rank.
                let beside = from.offset(df, 0).and_then(|s| self.board.piece_at(s));
                if beside.is_some_and(|p| p.piece_type == PieceType::Pawn && p.color != color) {
                    targets.push(diagonal);
                }
            }
        }
    }

    /// Knight and king steps onto empty or enemy squares.
    fn step_targets(
        &self,
        from: Square,
        color: Color,
        deltas: &[(i8, i8)],
        targets: &mut Vec<Square>,
    ) {
        for &(df, dr) in deltas {
            if let Some(to) = from.offset(df, dr) {
                if !self.board.is_color(to, color) {
                    targets.push(to);
                }
            }
        }
    }

    /// Generates sliding piece moves along the given directions.
    fn sliding_targets(
        &self,
        from: Square,
        color: Color,
        directions: &[(i8, i8)],
        targets: &mut Vec<Square>,
    ) {
        for &(df, dr) in directions {
            let mut current = from;

            while let Some(to) = current.offset(df, dr) {
                current = to;
                if self.board.is_empty(to) {
                    targets.push(to);
                } else {
                    if self.board.is_enemy(to, color) {
                        targets.push(to);
                    }
                    break; // Can't move past any piece
                }
            }
        }
    }

    /// Castling destinations, decided purely from `moved` flags, occupancy and attacks.
    fn castling_targets(&self, from: Square, king: Piece, targets: &mut Vec<Square>) {
        if king.moved || from.file() != File::E || from.rank() != king.color.back_rank() {
            return;
        }

        let opponent = king.color.opponent();
        let rank = from.rank();

        // (rook file, files strictly between king and rook, file crossed, destination file)
        let sides: [(File, &[File], File, File); 2] = [
            (File::H, &[File::F, File::G], File::F, File::G),
            (File::A, &[File::D, File::C, File::B], File::D, File::C),
        ];

        for (rook_file, between, crossed, dest) in sides {
            let rook_square = Square::new(rook_file, rank);
            let rook_ready = self.board.piece_at(rook_square).is_some_and(|p| {
                p.piece_type == PieceType::Rook && p.color == king.color && !p.moved
            });
            if !rook_ready {
                continue;
            }

            if between
                .iter()
                .any(|&file| !self.board.is_empty(Square::new(file, rank)))
            {
                continue;
            }

            let safe = [from, Square::new(crossed, rank), Square::new(dest, rank)]
                .iter()
                .all(|&s| !self.board.is_attacked_by(s, opponent));
            if safe {
                targets.push(Square::new(dest, rank));
            }
        }
    }
}
