//! Core value types shared by the board, generator, and search.

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::Light => 0,
            Color::Dark => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Light => Color::Dark,
            Color::Dark => Color::Light,
        }
    }

    #[inline]
    pub const fn from_bit(bit: u32) -> Self {
        if bit & 1 == 0 {
            Color::Light
        } else {
            Color::Dark
        }
    }
}

/// Piece kind (color is represented separately for cache-friendly layouts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PieceKind::Pawn => 0,
            PieceKind::Knight => 1,
            PieceKind::Bishop => 2,
            PieceKind::Rook => 3,
            PieceKind::Queen => 4,
            PieceKind::King => 5,
        }
    }

    /// Three-bit code used in the packed state word. Zero means "no piece".
    #[inline]
    pub const fn code(self) -> u32 {
        self.index() as u32 + 1
    }

    #[inline]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(PieceKind::Pawn),
            2 => Some(PieceKind::Knight),
            3 => Some(PieceKind::Bishop),
            4 => Some(PieceKind::Rook),
            5 => Some(PieceKind::Queen),
            6 => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Value counted in the running material total and used for capture ordering.
    #[inline]
    pub const fn material_value(self) -> i32 {
        match self {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 300,
            PieceKind::Bishop => 300,
            PieceKind::Rook => 500,
            PieceKind::Queen => 1000,
            PieceKind::King => 0,
        }
    }
}

/// Board square index (`0..=63`, `a1 == 0`, `h8 == 63`).
pub type Square = u8;

/// Four-bit castling rights set.
pub type CastlingRights = u8;

pub const CASTLE_LIGHT_KINGSIDE: CastlingRights = 1 << 0;
pub const CASTLE_DARK_KINGSIDE: CastlingRights = 1 << 1;
pub const CASTLE_LIGHT_QUEENSIDE: CastlingRights = 1 << 2;
pub const CASTLE_DARK_QUEENSIDE: CastlingRights = 1 << 3;
pub const CASTLE_ALL: CastlingRights = 0x0F;

#[inline]
pub const fn kingside_right(color: Color) -> CastlingRights {
    match color {
        Color::Light => CASTLE_LIGHT_KINGSIDE,
        Color::Dark => CASTLE_DARK_KINGSIDE,
    }
}

#[inline]
pub const fn queenside_right(color: Color) -> CastlingRights {
    match color {
        Color::Light => CASTLE_LIGHT_QUEENSIDE,
        Color::Dark => CASTLE_DARK_QUEENSIDE,
    }
}

#[inline]
pub const fn file_of(square: Square) -> u8 {
    square % 8
}

#[inline]
pub const fn rank_of(square: Square) -> u8 {
    square / 8
}

pub const RANK_1: u64 = 0x0000_0000_0000_00FF;
pub const RANK_2: u64 = 0x0000_0000_0000_FF00;
pub const RANK_4: u64 = 0x0000_0000_FF00_0000;
pub const RANK_5: u64 = 0x0000_00FF_0000_0000;
pub const RANK_7: u64 = 0x00FF_0000_0000_0000;
pub const RANK_8: u64 = 0xFF00_0000_0000_0000;
pub const FILE_A: u64 = 0x0101_0101_0101_0101;
pub const FILE_H: u64 = 0x8080_8080_8080_8080;

#[cfg(test)]
mod tests {
    use super::{Color, PieceKind};

    #[test]
    fn piece_codes_round_trip() {
        for piece in PieceKind::ALL {
            assert_eq!(PieceKind::from_code(piece.code()), Some(piece));
        }
        assert_eq!(PieceKind::from_code(0), None);
        assert_eq!(PieceKind::from_code(7), None);
    }

    #[test]
    fn color_bit_mapping() {
        assert_eq!(Color::from_bit(0), Color::Light);
        assert_eq!(Color::from_bit(1), Color::Dark);
        assert_eq!(Color::Light.opposite(), Color::Dark);
    }
}
