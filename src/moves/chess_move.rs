//! Packed 16-bit move encoding.
//!
//! Layout: `flag << 12 | from << 6 | to`. The 4-bit flag uses the classic
//! from-to-flags scheme: bit 2 marks captures and bit 3 marks promotions, with
//! the low two bits of a promotion flag selecting knight/bishop/rook/queen.

use std::fmt;

use crate::game_state::chess_types::{PieceKind, Square};
use crate::utils::algebraic::square_to_algebraic;

pub const FLAG_QUIET: u16 = 0;
pub const FLAG_DOUBLE_PAWN_PUSH: u16 = 1;
pub const FLAG_KING_CASTLE: u16 = 2;
pub const FLAG_QUEEN_CASTLE: u16 = 3;
pub const FLAG_CAPTURE: u16 = 4;
pub const FLAG_EN_PASSANT: u16 = 5;
pub const FLAG_KNIGHT_PROMOTION: u16 = 8;
pub const FLAG_BISHOP_PROMOTION: u16 = 9;
pub const FLAG_ROOK_PROMOTION: u16 = 10;
pub const FLAG_QUEEN_PROMOTION: u16 = 11;
pub const FLAG_KNIGHT_PROMOTION_CAPTURE: u16 = 12;
pub const FLAG_BISHOP_PROMOTION_CAPTURE: u16 = 13;
pub const FLAG_ROOK_PROMOTION_CAPTURE: u16 = 14;
pub const FLAG_QUEEN_PROMOTION_CAPTURE: u16 = 15;

const CAPTURE_BIT: u16 = 0b0100;
const PROMOTION_BIT: u16 = 0b1000;

/// Promotion flags in generation order (knight first, queen last).
pub const PROMOTION_FLAGS: [u16; 4] = [
    FLAG_KNIGHT_PROMOTION,
    FLAG_BISHOP_PROMOTION,
    FLAG_ROOK_PROMOTION,
    FLAG_QUEEN_PROMOTION,
];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move(u16);

impl Move {
    /// The all-zero move (`a1a1`), used as "no move".
    pub const NULL: Move = Move(0);

    #[inline]
    pub const fn new(from: Square, to: Square, flag: u16) -> Self {
        Move(((flag & 0xF) << 12) | (((from as u16) & 0x3F) << 6) | ((to as u16) & 0x3F))
    }

    #[inline]
    pub const fn from(self) -> Square {
        ((self.0 >> 6) & 0x3F) as Square
    }

    #[inline]
    pub const fn to(self) -> Square {
        (self.0 & 0x3F) as Square
    }

    #[inline]
    pub const fn flag(self) -> u16 {
        self.0 >> 12
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        self.flag() & CAPTURE_BIT != 0
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.flag() & PROMOTION_BIT != 0
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        self.flag() == FLAG_EN_PASSANT
    }

    #[inline]
    pub const fn is_double_push(self) -> bool {
        self.flag() == FLAG_DOUBLE_PAWN_PUSH
    }

    #[inline]
    pub const fn is_castle(self) -> bool {
        matches!(self.flag(), FLAG_KING_CASTLE | FLAG_QUEEN_CASTLE)
    }

    #[inline]
    pub const fn is_quiet(self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }

    #[inline]
    pub const fn promotion_piece(self) -> Option<PieceKind> {
        if !self.is_promotion() {
            return None;
        }
        Some(match self.flag() & 0b11 {
            0 => PieceKind::Knight,
            1 => PieceKind::Bishop,
            2 => PieceKind::Rook,
            _ => PieceKind::Queen,
        })
    }

    /// Coordinate notation such as `e2e4` or `e7e8q`.
    pub fn to_long_algebraic(self) -> String {
        if self.is_null() {
            return "0000".to_owned();
        }
        let mut out = String::with_capacity(5);
        out.push_str(&square_to_algebraic(self.from()).unwrap_or_default());
        out.push_str(&square_to_algebraic(self.to()).unwrap_or_default());
        if let Some(piece) = self.promotion_piece() {
            out.push(match piece {
                PieceKind::Knight => 'n',
                PieceKind::Bishop => 'b',
                PieceKind::Rook => 'r',
                _ => 'q',
            });
        }
        out
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_long_algebraic())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({} flag={})", self.to_long_algebraic(), self.flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_pack_and_unpack() {
        let mv = Move::new(12, 28, FLAG_DOUBLE_PAWN_PUSH);
        assert_eq!(mv.from(), 12);
        assert_eq!(mv.to(), 28);
        assert!(mv.is_double_push());
        assert!(!mv.is_capture());
        assert_eq!(mv.to_long_algebraic(), "e2e4");
    }

    #[test]
    fn promotion_capture_flags() {
        let mv = Move::new(49, 56, FLAG_QUEEN_PROMOTION_CAPTURE);
        assert!(mv.is_capture());
        assert!(mv.is_promotion());
        assert_eq!(mv.promotion_piece(), Some(PieceKind::Queen));
        assert_eq!(mv.to_long_algebraic(), "b7a8q");

        let under = Move::new(52, 60, FLAG_KNIGHT_PROMOTION);
        assert!(!under.is_capture());
        assert_eq!(under.promotion_piece(), Some(PieceKind::Knight));
        assert_eq!(under.to_string(), "e7e8n");
    }

    #[test]
    fn en_passant_counts_as_capture() {
        let mv = Move::new(36, 43, FLAG_EN_PASSANT);
        assert!(mv.is_capture());
        assert!(mv.is_en_passant());
        assert!(!mv.is_quiet());
    }

    #[test]
    fn null_move_prints_as_zeroes() {
        assert!(Move::NULL.is_null());
        assert_eq!(Move::NULL.to_string(), "0000");
    }
}
