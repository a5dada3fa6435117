//! Packed irreversible state pushed once per ply.
//!
//! Layout of the 32-bit word:
//!
//! ```text
//! bit  0       side to move (1 = dark)
//! bits 1..=4   castling rights
//! bit  5       en-passant available
//! bits 6..=8   en-passant file
//! bits 9..=11  captured piece code (0 = none)
//! bits 12..=17 light king square
//! bits 18..=23 dark king square
//! bits 24..=30 halfmove clock (saturates at 127)
//! ```

use crate::game_state::chess_types::*;

const SIDE_SHIFT: u32 = 0;
const CASTLING_SHIFT: u32 = 1;
const EP_FLAG_SHIFT: u32 = 5;
const EP_FILE_SHIFT: u32 = 6;
const CAPTURED_SHIFT: u32 = 9;
const KING_SHIFT: u32 = 12;
const HALFMOVE_SHIFT: u32 = 24;

const CASTLING_MASK: u32 = 0xF << CASTLING_SHIFT;
const EP_MASK: u32 = (1 << EP_FLAG_SHIFT) | (0x7 << EP_FILE_SHIFT);
const CAPTURED_MASK: u32 = 0x7 << CAPTURED_SHIFT;
const HALFMOVE_MASK: u32 = 0x7F << HALFMOVE_SHIFT;
const HALFMOVE_MAX: u32 = 0x7F;

/// Bits compared by position equality: side, castling, and en-passant.
const REVERSIBLE_MASK: u32 = (1 << SIDE_SHIFT) | CASTLING_MASK | EP_MASK;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateWord(u32);

impl StateWord {
    #[inline]
    pub const fn side_to_move(self) -> Color {
        Color::from_bit(self.0 >> SIDE_SHIFT)
    }

    #[inline]
    pub fn toggle_side_to_move(&mut self) {
        self.0 ^= 1 << SIDE_SHIFT;
    }

    #[inline]
    pub fn set_side_to_move(&mut self, color: Color) {
        self.0 = (self.0 & !(1 << SIDE_SHIFT)) | ((color.index() as u32) << SIDE_SHIFT);
    }

    #[inline]
    pub const fn castling_rights(self) -> CastlingRights {
        ((self.0 & CASTLING_MASK) >> CASTLING_SHIFT) as CastlingRights
    }

    #[inline]
    pub fn set_castling_rights(&mut self, rights: CastlingRights) {
        self.0 = (self.0 & !CASTLING_MASK) | (((rights & CASTLE_ALL) as u32) << CASTLING_SHIFT);
    }

    #[inline]
    pub const fn en_passant_file(self) -> Option<u8> {
        if self.0 & (1 << EP_FLAG_SHIFT) == 0 {
            None
        } else {
            Some(((self.0 >> EP_FILE_SHIFT) & 0x7) as u8)
        }
    }

    #[inline]
    pub fn set_en_passant_file(&mut self, file: u8) {
        self.0 = (self.0 & !EP_MASK) | (1 << EP_FLAG_SHIFT) | (((file & 0x7) as u32) << EP_FILE_SHIFT);
    }

    #[inline]
    pub fn clear_en_passant(&mut self) {
        self.0 &= !EP_MASK;
    }

    /// Target square of an en-passant capture, derived from the file and side to move.
    #[inline]
    pub fn en_passant_square(self) -> Option<Square> {
        let file = self.en_passant_file()?;
        let rank = match self.side_to_move() {
            Color::Light => 5,
            Color::Dark => 2,
        };
        Some(rank * 8 + file)
    }

    #[inline]
    pub const fn captured_piece(self) -> Option<PieceKind> {
        PieceKind::from_code((self.0 & CAPTURED_MASK) >> CAPTURED_SHIFT)
    }

    #[inline]
    pub fn set_captured_piece(&mut self, piece: Option<PieceKind>) {
        let code = piece.map_or(0, PieceKind::code);
        self.0 = (self.0 & !CAPTURED_MASK) | (code << CAPTURED_SHIFT);
    }

    #[inline]
    pub const fn king_square(self, color: Color) -> Square {
        ((self.0 >> (KING_SHIFT + 6 * color.index() as u32)) & 0x3F) as Square
    }

    #[inline]
    pub fn set_king_square(&mut self, color: Color, square: Square) {
        let shift = KING_SHIFT + 6 * color.index() as u32;
        self.0 = (self.0 & !(0x3F << shift)) | (((square & 0x3F) as u32) << shift);
    }

    #[inline]
    pub const fn halfmove_clock(self) -> u32 {
        (self.0 & HALFMOVE_MASK) >> HALFMOVE_SHIFT
    }

    #[inline]
    pub fn set_halfmove_clock(&mut self, clock: u32) {
        let clamped = clock.min(HALFMOVE_MAX);
        self.0 = (self.0 & !HALFMOVE_MASK) | (clamped << HALFMOVE_SHIFT);
    }

    #[inline]
    pub fn increment_halfmove_clock(&mut self) {
        let next = self.halfmove_clock() + 1;
        self.set_halfmove_clock(next);
    }

    #[inline]
    pub fn reset_halfmove_clock(&mut self) {
        self.0 &= !HALFMOVE_MASK;
    }

    #[inline]
    pub const fn reversible_bits(self) -> u32 {
        self.0 & REVERSIBLE_MASK
    }
}
