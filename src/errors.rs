//! Error types shared by every engine subsystem.
//!
//! Input errors (bad FEN, unknown moves, out-of-range options) are reported back
//! to the caller with the live position untouched. Board desynchronisation
//! errors surface from make/unmake and abort the running search.

use thiserror::Error;

use crate::game_state::chess_types::Square;

/// Errors raised by position handling, move resolution, and the search engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The position text could not be parsed.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// A coordinate such as `e4` was malformed.
    #[error("invalid square: {0}")]
    InvalidSquare(String),

    /// A coordinate move did not match any pseudo-legal move.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// Requested transposition table size is outside the accepted range.
    #[error("hash size {requested} MB is outside {min}..={max} MB")]
    HashSizeOutOfRange {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// A move referenced a square with no piece on it.
    #[error("no piece on square {square} while {context}")]
    MissingPiece {
        square: Square,
        context: &'static str,
    },

    /// `undo_move` was called with no move left to undo.
    #[error("state history is empty")]
    EmptyHistory,

    /// The search context mutex was poisoned by a panicking worker.
    #[error("search context lock poisoned")]
    LockPoisoned,

    /// The search worker thread panicked before returning.
    #[error("search worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
