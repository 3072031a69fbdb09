pub mod attacks;
pub mod board;
pub mod error;
pub mod fen;
pub mod game_state;
pub mod history;
pub mod move_gen;
pub mod mover;
pub mod perft;
pub mod types;

pub use board::*;
pub use error::{ChessError, ChessResult};
pub use fen::{positions, FenError};
pub use game_state::*;
pub use history::{CastleRecord, HistoryEntry, PromotionRecord};
pub use move_gen::*;
pub use mover::ScopedMove;
pub use perft::{perft, perft_detailed, perft_divide, PerftResults};
pub use types::*;
