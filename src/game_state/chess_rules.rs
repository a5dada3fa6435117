//! Canonical chess-rule constants.
//!
//! Holds the standard starting FEN, the castling-revocation table applied on
//! every move, and the king/rook squares involved in each castle.

use crate::game_state::chess_types::*;

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling rights kept when a move starts or ends on a square.
///
/// Moving from or to a1/e1/h1/a8/e8/h8 drops the rights tied to that square,
/// so a rook capture on h8 also revokes dark's kingside right.
pub const CASTLING_KEEP_MASK: [CastlingRights; 64] = build_castling_keep_mask();

const fn build_castling_keep_mask() -> [CastlingRights; 64] {
    let mut table = [CASTLE_ALL; 64];
    table[0] = CASTLE_ALL & !CASTLE_LIGHT_QUEENSIDE;
    table[4] = CASTLE_ALL & !(CASTLE_LIGHT_KINGSIDE | CASTLE_LIGHT_QUEENSIDE);
    table[7] = CASTLE_ALL & !CASTLE_LIGHT_KINGSIDE;
    table[56] = CASTLE_ALL & !CASTLE_DARK_QUEENSIDE;
    table[60] = CASTLE_ALL & !(CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE);
    table[63] = CASTLE_ALL & !CASTLE_DARK_KINGSIDE;
    table
}

/// Squares describing one castle for one side.
#[derive(Debug, Clone, Copy)]
pub struct CastlePath {
    pub right: CastlingRights,
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
    /// Squares that must be empty.
    pub empty_mask: u64,
    /// Squares the king stands on or crosses; none may be attacked.
    pub safe_squares: [Square; 3],
}

pub const KINGSIDE_CASTLES: [CastlePath; 2] = [
    CastlePath {
        right: CASTLE_LIGHT_KINGSIDE,
        king_from: 4,
        king_to: 6,
        rook_from: 7,
        rook_to: 5,
        empty_mask: 0x0000_0000_0000_0060,
        safe_squares: [4, 5, 6],
    },
    CastlePath {
        right: CASTLE_DARK_KINGSIDE,
        king_from: 60,
        king_to: 62,
        rook_from: 63,
        rook_to: 61,
        empty_mask: 0x6000_0000_0000_0000,
        safe_squares: [60, 61, 62],
    },
];

pub const QUEENSIDE_CASTLES: [CastlePath; 2] = [
    CastlePath {
        right: CASTLE_LIGHT_QUEENSIDE,
        king_from: 4,
        king_to: 2,
        rook_from: 0,
        rook_to: 3,
        empty_mask: 0x0000_0000_0000_000E,
        safe_squares: [4, 3, 2],
    },
    CastlePath {
        right: CASTLE_DARK_QUEENSIDE,
        king_from: 60,
        king_to: 58,
        rook_from: 56,
        rook_to: 59,
        empty_mask: 0x0E00_0000_0000_0000,
        safe_squares: [60, 59, 58],
    },
];
