//! Legality filter and the mutating half of the game: apply, promote, undo.

use std::ops::Deref;

use log::{error, trace};

use crate::error::{ChessError, ChessResult};
use crate::game_state::{GameState, PendingPromotion};
use crate::history::{CastleRecord, HistoryEntry, PromotionRecord};
use crate::types::{File, Move, Piece, PieceType, Promotion, Square};

impl GameState {
    /// Returns true if moving `from` to `to` leaves the mover's king unattacked.
    ///
    /// The move is simulated on a copy of the board; nothing else on the state
    /// is touched. A side without a king has every move accepted.
    pub fn is_legal(&self, from: Square, to: Square) -> bool {
        let Some(piece) = self.board.piece_at(from) else {
            return false;
        };

        let mut board = self.board;
        if let Some(victim) = self.en_passant_victim(piece, from, to) {
            board.take(victim);
        }
        board.move_piece(from, to);
        if let Some((rook_from, rook_to)) = castling_rook_squares(piece, from, to) {
            board.move_piece(rook_from, rook_to);
        }

        match board.king_square(piece.color) {
            Some(king) => !board.is_attacked_by(king, piece.color.opponent()),
            None => true,
        }
    }

    /// Applies a legal move for the side to move and records it in history.
    ///
    /// A pawn reaching its last rank leaves a pending promotion and keeps the
    /// turn until [`GameState::resolve_promotion`] is called. On error the
    /// state is unchanged.
    pub fn apply_move(&mut self, from: Square, to: Square) -> ChessResult<()> {
        if let Some(pending) = self.pending_promotion {
            return Err(ChessError::PromotionPending(pending.square));
        }

        let piece = self
            .board
            .piece_at(from)
            .ok_or(ChessError::NoPieceAtSquare(from))?;

        if piece.color != self.turn || !self.legal_moves(from).contains(&to) {
            return Err(ChessError::IllegalMove { from, to });
        }

        let color = piece.color;

        // Regular capture or the pawn taken en passant behind the destination.
        let en_passant_victim = self.en_passant_victim(piece, from, to);
        let captured = match en_passant_victim {
            Some(victim) => self.board.take(victim).map(|p| (victim, p)),
            None => self.board.piece_at(to).map(|p| (to, p)),
        };
        let capture_points = captured.map_or(0, |(_, p)| p.piece_type.capture_value());

        let castle = castling_rook_squares(piece, from, to).and_then(|(rook_from, rook_to)| {
            let rook = self.board.take(rook_from)?;
            self.board.set_piece(rook_to, Some(rook.marked_moved()));
            Some(CastleRecord {
                rook_from,
                rook_to,
                rook,
            })
        });

        self.board.move_piece(from, to);
        self.board.set_piece(to, Some(piece.marked_moved()));
        *self.scores.get_mut(color) += capture_points;

        let prev_en_passant = self.en_passant;
        self.en_passant = if piece.piece_type == PieceType::Pawn
            && from.rank().index().abs_diff(to.rank().index()) == 2
        {
            from.offset(0, color.pawn_direction())
        } else {
            None
        };

        let prev_turn = self.turn;
        let promotion =
            if piece.piece_type == PieceType::Pawn && to.rank() == color.promotion_rank() {
                self.pending_promotion = Some(PendingPromotion { square: to, color });
                Some(PromotionRecord::Pending)
            } else {
                self.turn = color.opponent();
                None
            };

        self.history.push(HistoryEntry {
            from,
            to,
            piece,
            captured,
            prev_en_passant,
            prev_turn,
            castle,
            en_passant_capture: en_passant_victim.is_some(),
            promotion,
            capture_points,
        });

        trace!("applied {from}{to} for {color}");
        Ok(())
    }

    /// Applies a move after checking the piece on `from` is a `piece_type`.
    pub fn apply_typed_move(
        &mut self,
        piece_type: PieceType,
        from: Square,
        to: Square,
    ) -> ChessResult<()> {
        let piece = self
            .board
            .piece_at(from)
            .ok_or(ChessError::NoPieceAtSquare(from))?;

        if piece.piece_type != piece_type {
            return Err(ChessError::WrongPieceType {
                square: from,
                expected: piece_type,
                found: piece.piece_type,
            });
        }

        self.apply_move(from, to)
    }

    /// Replaces the pending pawn with `choice` and passes the turn.
    pub fn resolve_promotion(&mut self, choice: Promotion) -> ChessResult<()> {
        let pending = self
            .pending_promotion
            .take()
            .ok_or(ChessError::NoPendingPromotion)?;

        let promoted = Piece::new(choice.piece_type(), pending.color).marked_moved();
        self.board.set_piece(pending.square, Some(promoted));
        self.turn = pending.color.opponent();

        if let Some(entry) = self.history.last_mut() {
            entry.promotion = Some(PromotionRecord::Resolved(choice.piece_type()));
        }

        trace!("promoted on {} to {}", pending.square, choice.piece_type());
        Ok(())
    }

    /// Applies `mv` and, if it promotes, resolves with `choice`.
    pub fn play(&mut self, mv: Move, choice: Promotion) -> ChessResult<()> {
        self.apply_move(mv.from, mv.to)?;
        if self.pending_promotion.is_some() {
            self.resolve_promotion(choice)?;
        }
        Ok(())
    }

    /// Reverts the most recent history entry exactly.
    ///
    /// Undoing a promotion, pending or resolved, puts the original pawn back.
    pub fn undo_last_move(&mut self) -> ChessResult<()> {
        let entry = self.history.pop().ok_or(ChessError::EmptyHistory)?;

        self.board.set_piece(entry.to, None);
        self.board.set_piece(entry.from, Some(entry.piece));

        if let Some((square, piece)) = entry.captured {
            self.board.set_piece(square, Some(piece));
        }

        if let Some(castle) = entry.castle {
            self.board.set_piece(castle.rook_to, None);
            self.board.set_piece(castle.rook_from, Some(castle.rook));
        }

        *self.scores.get_mut(entry.piece.color) -= entry.capture_points;
        self.en_passant = entry.prev_en_passant;
        self.turn = entry.prev_turn;
        self.pending_promotion = None;

        trace!("undid {}{}", entry.from, entry.to);
        Ok(())
    }

    /// The square of the pawn captured if `piece` moves `from` to `to` en passant.
    fn en_passant_victim(&self, piece: Piece, from: Square, to: Square) -> Option<Square> {
        let diagonal = from.file() != to.file();
        if piece.piece_type == PieceType::Pawn
            && diagonal
            && self.en_passant == Some(to)
            && self.board.is_empty(to)
        {
            Some(Square::new(to.file(), from.rank()))
        } else {
            None
        }
    }
}

/// Rook origin and destination when a king move of two files is castling.
fn castling_rook_squares(piece: Piece, from: Square, to: Square) -> Option<(Square, Square)> {
    if piece.piece_type != PieceType::King
        || from.file().index().abs_diff(to.file().index()) != 2
    {
        return None;
    }

    let rank = from.rank();
    if to.file() == File::G {
        Some((Square::new(File::H, rank), Square::new(File::F, rank)))
    } else {
        Some((Square::new(File::A, rank), Square::new(File::D, rank)))
    }
}

/// A move applied for the lifetime of the guard and undone when it drops.
///
/// Promotions are resolved immediately, to a queen unless another choice is
/// given. The guard only hands out shared access to the state; further moves
/// go through [`ScopedMove::nest`], so every apply has a matching undo.
pub struct ScopedMove<'a> {
    state: &'a mut GameState,
    applied: bool,
}

impl<'a> ScopedMove<'a> {
    /// Takes exclusive hold of `state` without applying a move. Dropping it
    /// leaves the state as it was; moves are made with `nest`.
    pub fn root(state: &'a mut GameState) -> Self {
        Self {
            state,
            applied: false,
        }
    }

    pub fn apply(state: &'a mut GameState, mv: Move) -> ChessResult<Self> {
        Self::apply_with(state, mv, Promotion::Queen)
    }

    pub fn apply_with(state: &'a mut GameState, mv: Move, choice: Promotion) -> ChessResult<Self> {
        state.apply_move(mv.from, mv.to)?;
        if state.pending_promotion.is_some() {
            if let Err(err) = state.resolve_promotion(choice) {
                state.undo_last_move()?;
                return Err(err);
            }
        }
        Ok(Self {
            state,
            applied: true,
        })
    }

    /// Applies `mv` on top of this guard's position.
    pub fn nest(&mut self, mv: Move) -> ChessResult<ScopedMove<'_>> {
        ScopedMove::apply(&mut *self.state, mv)
    }

    pub fn nest_with(&mut self, mv: Move, choice: Promotion) -> ChessResult<ScopedMove<'_>> {
        ScopedMove::apply_with(&mut *self.state, mv, choice)
    }
}

impl Deref for ScopedMove<'_> {
    type Target = GameState;

    fn deref(&self) -> &GameState {
        self.state
    }
}

impl Drop for ScopedMove<'_> {
    fn drop(&mut self) {
        if !self.applied {
            return;
        }
        if let Err(err) = self.state.undo_last_move() {
            error!("scoped move could not be undone: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::{GameStatus, Scores};
    use crate::types::Color;
    use proptest::prelude::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn play_all(state: &mut GameState, moves: &[&str]) {
        for text in moves {
            let mv: Move = text.parse().unwrap();
            state
                .apply_move(mv.from, mv.to)
                .unwrap_or_else(|e| panic!("{text}: {e}"));
        }
    }

    fn place(state: &mut GameState, square: &str, piece_type: PieceType, color: Color) {
        state
            .board
            .set_piece(sq(square), Some(Piece::new(piece_type, color)));
    }

    #[test]
    fn test_opening_move_and_wrong_side() {
        let mut state = GameState::new();
        assert!(state.apply_move(sq("e2"), sq("e4")).is_ok());
        assert_eq!(state.turn, Color::Black);
        assert_eq!(state.en_passant, Some(sq("e3")));

        let before = state.clone();
        assert_eq!(
            state.apply_move(sq("e4"), sq("e6")),
            Err(ChessError::IllegalMove {
                from: sq("e4"),
                to: sq("e6")
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_error_cases() {
        let mut state = GameState::new();
        assert_eq!(
            state.apply_move(sq("e3"), sq("e4")),
            Err(ChessError::NoPieceAtSquare(sq("e3")))
        );
        assert_eq!(
            state.apply_move(sq("e2"), sq("e5")),
            Err(ChessError::IllegalMove {
                from: sq("e2"),
                to: sq("e5")
            })
        );
        assert_eq!(state.undo_last_move(), Err(ChessError::EmptyHistory));
        assert_eq!(
            state.resolve_promotion(Promotion::Queen),
            Err(ChessError::NoPendingPromotion)
        );
        assert_eq!(
            state.apply_typed_move(PieceType::Knight, sq("e2"), sq("e4")),
            Err(ChessError::WrongPieceType {
                square: sq("e2"),
                expected: PieceType::Knight,
                found: PieceType::Pawn
            })
        );
        assert!(state
            .apply_typed_move(PieceType::Knight, sq("g1"), sq("f3"))
            .is_ok());
    }

    #[test]
    fn test_en_passant_capture() {
        let mut state = GameState::new();
        play_all(&mut state, &["e2e4", "a7a6", "e4e5", "d7d5"]);

        assert_eq!(state.en_passant, Some(sq("d6")));
        assert!(state.legal_moves(sq("e5")).contains(&sq("d6")));

        state.apply_move(sq("e5"), sq("d6")).unwrap();
        assert!(state.piece_at(sq("d5")).is_none());
        assert_eq!(
            state.piece_at(sq("d6")).map(|p| p.piece_type),
            Some(PieceType::Pawn)
        );
        assert_eq!(state.scores().white, 1);
        assert!(state.history().last().unwrap().en_passant_capture);

        state.undo_last_move().unwrap();
        assert_eq!(
            state.piece_at(sq("d5")).map(|p| p.color),
            Some(Color::Black)
        );
        assert!(state.piece_at(sq("d6")).is_none());
        assert_eq!(state.scores(), Scores::default());
        assert_eq!(state.en_passant, Some(sq("d6")));
    }

    #[test]
    fn test_en_passant_expires() {
        let mut state = GameState::new();
        play_all(&mut state, &["e2e4", "a7a6", "e4e5", "d7d5", "h2h3", "h7h6"]);
        assert!(!state.legal_moves(sq("e5")).contains(&sq("d6")));
    }

    #[test]
    fn test_fools_mate() {
        let mut state = GameState::new();
        play_all(&mut state, &["f2f3", "e7e5", "g2g4", "d8h4"]);

        let status = state.status();
        assert_eq!(
            status,
            GameStatus::Checkmate {
                winner: Color::Black
            }
        );
        assert_eq!(status.winner(), Some(Color::Black));
        assert!(state.all_legal_moves(Color::White).is_empty());
    }

    #[test]
    fn test_stalemate() {
        let mut state = GameState::empty();
        place(&mut state, "a8", PieceType::King, Color::Black);
        place(&mut state, "b6", PieceType::Queen, Color::White);
        place(&mut state, "h1", PieceType::King, Color::White);
        state.turn = Color::Black;

        assert_eq!(state.status(), GameStatus::Stalemate);
    }

    #[test]
    fn test_promotion_flow() {
        let mut state = GameState::empty();
        place(&mut state, "a7", PieceType::Pawn, Color::White);
        place(&mut state, "e1", PieceType::King, Color::White);
        place(&mut state, "h6", PieceType::King, Color::Black);
        let before = state.clone();

        state.apply_move(sq("a7"), sq("a8")).unwrap();
        assert_eq!(
            state.pending_promotion(),
            Some(PendingPromotion {
                square: sq("a8"),
                color: Color::White
            })
        );
        assert_eq!(state.turn, Color::White);
        assert_eq!(
            state.apply_move(sq("e1"), sq("e2")),
            Err(ChessError::PromotionPending(sq("a8")))
        );

        state.resolve_promotion(Promotion::Queen).unwrap();
        let queen = state.piece_at(sq("a8")).unwrap();
        assert_eq!(queen.piece_type, PieceType::Queen);
        assert!(queen.moved);
        assert_eq!(state.turn, Color::Black);
        assert_eq!(
            state.history().last().unwrap().promotion,
            Some(PromotionRecord::Resolved(PieceType::Queen))
        );

        state.undo_last_move().unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_undo_pending_promotion() {
        let mut state = GameState::empty();
        place(&mut state, "b2", PieceType::Pawn, Color::Black);
        place(&mut state, "a1", PieceType::Rook, Color::White);
        place(&mut state, "h1", PieceType::King, Color::White);
        place(&mut state, "h8", PieceType::King, Color::Black);
        state.turn = Color::Black;
        let before = state.clone();

        state.apply_move(sq("b2"), sq("a1")).unwrap();
        assert_eq!(state.scores().black, 5);
        assert!(state.pending_promotion().is_some());

        state.undo_last_move().unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_kingside_castling() {
        let mut state = GameState::new();
        state.board.set_piece(sq("f1"), None);
        state.board.set_piece(sq("g1"), None);
        let before = state.clone();

        state.apply_move(sq("e1"), sq("g1")).unwrap();
        let king = state.piece_at(sq("g1")).unwrap();
        let rook = state.piece_at(sq("f1")).unwrap();
        assert_eq!(king.piece_type, PieceType::King);
        assert_eq!(rook.piece_type, PieceType::Rook);
        assert!(king.moved && rook.moved);
        assert!(state.piece_at(sq("h1")).is_none());
        assert!(state.history().last().unwrap().is_castle());

        state.undo_last_move().unwrap();
        assert_eq!(state, before);
        assert!(!state.piece_at(sq("h1")).unwrap().moved);
    }

    #[test]
    fn test_queenside_castling() {
        let mut state = GameState::empty();
        place(&mut state, "e8", PieceType::King, Color::Black);
        place(&mut state, "a8", PieceType::Rook, Color::Black);
        place(&mut state, "e1", PieceType::King, Color::White);
        state.turn = Color::Black;

        state.apply_move(sq("e8"), sq("c8")).unwrap();
        assert_eq!(
            state.piece_at(sq("d8")).map(|p| p.piece_type),
            Some(PieceType::Rook)
        );
        assert!(state.piece_at(sq("a8")).is_none());
    }

    #[test]
    fn test_capture_scores() {
        let mut state = GameState::new();
        play_all(&mut state, &["e2e4", "d7d5", "e4d5", "d8d5"]);
        assert_eq!(state.scores(), Scores { white: 1, black: 1 });
        assert_eq!(state.scores().diff(), 0);
    }

    #[test]
    fn test_scoped_move_restores_state() {
        let mut state = GameState::new();
        let before = state.clone();
        {
            let mut outer = ScopedMove::apply(&mut state, "e2e4".parse().unwrap()).unwrap();
            assert_eq!(outer.turn, Color::Black);
            {
                let inner = outer.nest("e7e5".parse().unwrap()).unwrap();
                assert_eq!(inner.history().len(), 2);
            }
            assert_eq!(outer.history().len(), 1);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_root_guard_keeps_existing_history() {
        let mut state = GameState::new();
        play_all(&mut state, &["e2e4", "e7e5"]);
        let before = state.clone();
        {
            let mut root = ScopedMove::root(&mut state);
            let child = root.nest("g1f3".parse().unwrap()).unwrap();
            assert_eq!(child.history().len(), 3);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_scoped_move_rejects_illegal() {
        let mut state = GameState::new();
        assert!(ScopedMove::apply(&mut state, "e2e5".parse().unwrap()).is_err());
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_scoped_move_auto_promotes() {
        let mut state = GameState::empty();
        place(&mut state, "c7", PieceType::Pawn, Color::White);
        place(&mut state, "e1", PieceType::King, Color::White);
        place(&mut state, "h6", PieceType::King, Color::Black);
        {
            let guard =
                ScopedMove::apply_with(&mut state, "c7c8".parse().unwrap(), Promotion::Knight)
                    .unwrap();
            assert_eq!(
                guard.piece_at(sq("c8")).map(|p| p.piece_type),
                Some(PieceType::Knight)
            );
            assert_eq!(guard.turn, Color::Black);
        }
        assert_eq!(
            state.piece_at(sq("c7")).map(|p| p.piece_type),
            Some(PieceType::Pawn)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_apply_undo_round_trip(choices in prop::collection::vec(any::<u16>(), 0..40)) {
            let mut state = GameState::new();
            let mut snapshots = Vec::new();

            for choice in choices {
                let moves = state.all_legal_moves(state.turn);
                if moves.is_empty() {
                    break;
                }
                let mv = moves.as_slice()[choice as usize % moves.len()];
                let promotion = Promotion::ALL[choice as usize % Promotion::ALL.len()];

                snapshots.push(state.clone());
                state.play(mv, promotion).unwrap();

                // The mover's king is never left attacked.
                let mover = state.turn.opponent();
                prop_assert!(!state.is_in_check(mover));
            }

            while let Some(snapshot) = snapshots.pop() {
                state.undo_last_move().unwrap();
                prop_assert_eq!(&state, &snapshot);
            }
            prop_assert_eq!(state, GameState::new());
        }
    }
}
