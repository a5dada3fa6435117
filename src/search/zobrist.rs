//! Zobrist hashing keys for fast position identity and repetition tracking.
//!
//! The keys are drawn from a fixed-seed generator so hashes are deterministic
//! across runs, which is useful for testing and debugging. A key set is built
//! once at startup and shared (`Arc`) by every position derived from it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game_state::chess_types::*;
use crate::game_state::state_word::StateWord;

const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct ZobristKeys {
    piece_square: [[[u64; 64]; 6]; 2],
    side_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl ZobristKeys {
    pub fn new() -> Self {
        Self::with_seed(ZOBRIST_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut piece_square = [[[0u64; 64]; 6]; 2];
        for color in &mut piece_square {
            for piece in color {
                for sq in piece {
                    *sq = rng.random();
                }
            }
        }

        let side_to_move = rng.random();

        let mut castling = [0u64; 16];
        for key in &mut castling {
            *key = rng.random();
        }

        let mut en_passant_file = [0u64; 8];
        for key in &mut en_passant_file {
            *key = rng.random();
        }

        Self {
            piece_square,
            side_to_move,
            castling,
            en_passant_file,
        }
    }

    /// Key for a `(color, piece, square)` occupancy term.
    #[inline]
    pub fn piece_square(&self, color: Color, piece: PieceKind, square: Square) -> u64 {
        self.piece_square[color.index()][piece.index()][square as usize]
    }

    #[inline]
    pub fn castling(&self, rights: CastlingRights) -> u64 {
        self.castling[(rights & CASTLE_ALL) as usize]
    }

    #[inline]
    pub fn en_passant_file(&self, file: u8) -> u64 {
        self.en_passant_file[(file & 7) as usize]
    }

    /// Side-to-move toggle key (xor in when dark to move).
    #[inline]
    pub fn side_to_move(&self) -> u64 {
        self.side_to_move
    }

    /// Combined contribution of the hashed fields of a state word.
    #[inline]
    pub fn state_key(&self, state: StateWord) -> u64 {
        let mut key = self.castling(state.castling_rights());
        if let Some(file) = state.en_passant_file() {
            key ^= self.en_passant_file(file);
        }
        if state.side_to_move() == Color::Dark {
            key ^= self.side_to_move;
        }
        key
    }
}
