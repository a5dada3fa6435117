//! Precomputed attack sets for every piece on every square.
//!
//! Leapers (knight, king, pawn per side) use square-indexed tables generated at
//! compile time. Sliders use magic bitboards: the relevant blockers are masked,
//! multiplied by a per-square magic, and shifted into a dense index into a table
//! filled once at construction by ray-tracing every blocker subset.
//!
//! `AttackTables` is immutable after `new()`. Build one at startup and share it
//! (`Arc`) with every generator.

use crate::game_state::chess_types::*;
use crate::moves::magic_numbers::{BISHOP_MAGICS, BISHOP_SHIFTS, ROOK_MAGICS, ROOK_SHIFTS};

const ROOK_DIRECTIONS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const BISHOP_DIRECTIONS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub const KNIGHT_ATTACKS: [u64; 64] = generate_leaper_attacks(&[
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
]);

pub const KING_ATTACKS: [u64; 64] = generate_leaper_attacks(&[
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
]);

/// Pawn capture targets indexed by `[color][square]`.
pub const PAWN_ATTACKS: [[u64; 64]; 2] = [
    generate_leaper_attacks(&[(-1, 1), (1, 1)]),
    generate_leaper_attacks(&[(-1, -1), (1, -1)]),
];

#[derive(Debug, Clone, Copy, Default)]
struct MagicEntry {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl MagicEntry {
    #[inline]
    fn index(&self, occupancy: u64) -> usize {
        self.offset + ((occupancy & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

#[derive(Debug, Clone)]
pub struct AttackTables {
    rook_entries: [MagicEntry; 64],
    bishop_entries: [MagicEntry; 64],
    rook_table: Vec<u64>,
    bishop_table: Vec<u64>,
}

impl Default for AttackTables {
    fn default() -> Self {
        Self::new()
    }
}

impl AttackTables {
    pub fn new() -> Self {
        let (rook_entries, rook_table) = build_slider_table(&ROOK_DIRECTIONS, &ROOK_MAGICS, &ROOK_SHIFTS);
        let (bishop_entries, bishop_table) =
            build_slider_table(&BISHOP_DIRECTIONS, &BISHOP_MAGICS, &BISHOP_SHIFTS);
        Self {
            rook_entries,
            bishop_entries,
            rook_table,
            bishop_table,
        }
    }

    #[inline]
    pub fn knight_attacks(&self, square: Square) -> u64 {
        KNIGHT_ATTACKS[square as usize]
    }

    #[inline]
    pub fn king_attacks(&self, square: Square) -> u64 {
        KING_ATTACKS[square as usize]
    }

    /// Squares a pawn of `color` standing on `square` attacks.
    #[inline]
    pub fn pawn_attacks(&self, color: Color, square: Square) -> u64 {
        PAWN_ATTACKS[color.index()][square as usize]
    }

    #[inline]
    pub fn rook_attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.rook_table[self.rook_entries[square as usize].index(occupancy)]
    }

    #[inline]
    pub fn bishop_attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.bishop_table[self.bishop_entries[square as usize].index(occupancy)]
    }

    #[inline]
    pub fn queen_attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.rook_attacks(square, occupancy) | self.bishop_attacks(square, occupancy)
    }

    /// Attack set for any non-pawn piece. Pawns need a color; use `pawn_attacks`.
    #[inline]
    pub fn piece_attacks(&self, piece: PieceKind, square: Square, occupancy: u64) -> u64 {
        match piece {
            PieceKind::Pawn => 0,
            PieceKind::Knight => self.knight_attacks(square),
            PieceKind::Bishop => self.bishop_attacks(square, occupancy),
            PieceKind::Rook => self.rook_attacks(square, occupancy),
            PieceKind::Queen => self.queen_attacks(square, occupancy),
            PieceKind::King => self.king_attacks(square),
        }
    }

    /// Squares strictly between two squares sharing a rank, file, or diagonal.
    pub fn between(&self, a: Square, b: Square) -> u64 {
        let b_bit = 1u64 << b;
        let a_bit = 1u64 << a;
        if self.rook_attacks(a, 0) & b_bit != 0 {
            self.rook_attacks(a, b_bit) & self.rook_attacks(b, a_bit)
        } else if self.bishop_attacks(a, 0) & b_bit != 0 {
            self.bishop_attacks(a, b_bit) & self.bishop_attacks(b, a_bit)
        } else {
            0
        }
    }
}

fn build_slider_table(
    directions: &[(i32, i32); 4],
    magics: &[u64; 64],
    shifts: &[u32; 64],
) -> ([MagicEntry; 64], Vec<u64>) {
    let mut entries = [MagicEntry::default(); 64];
    let mut offset = 0usize;

    for sq in 0..64 {
        let mask = relevant_mask(sq as i32, directions);
        entries[sq] = MagicEntry {
            mask,
            magic: magics[sq],
            shift: shifts[sq],
            offset,
        };
        offset += 1usize << (64 - shifts[sq]);
    }

    let mut table = vec![0u64; offset];
    for (sq, entry) in entries.iter().enumerate() {
        // Carry-rippler walk over every subset of the mask, starting at the empty set.
        let mut subset = 0u64;
        loop {
            table[entry.index(subset)] = trace_rays(sq as i32, directions, subset);
            subset = subset.wrapping_sub(entry.mask) & entry.mask;
            if subset == 0 {
                break;
            }
        }
    }

    (entries, table)
}

/// Ray squares that can hold a blocker, excluding the board edge at the end of each ray.
fn relevant_mask(square: i32, directions: &[(i32, i32); 4]) -> u64 {
    let mut mask = 0u64;
    for &(file_step, rank_step) in directions {
        let mut file = square % 8 + file_step;
        let mut rank = square / 8 + rank_step;
        while (0..8).contains(&(file + file_step)) && (0..8).contains(&(rank + rank_step)) {
            mask |= 1u64 << (rank * 8 + file);
            file += file_step;
            rank += rank_step;
        }
    }
    mask
}

fn trace_rays(square: i32, directions: &[(i32, i32); 4], occupancy: u64) -> u64 {
    let mut attacks = 0u64;
    for &(file_step, rank_step) in directions {
        let mut file = square % 8 + file_step;
        let mut rank = square / 8 + rank_step;
        while (0..8).contains(&file) && (0..8).contains(&rank) {
            let bit = 1u64 << (rank * 8 + file);
            attacks |= bit;
            if occupancy & bit != 0 {
                break;
            }
            file += file_step;
            rank += rank_step;
        }
    }
    attacks
}

const fn generate_leaper_attacks(offsets: &[(i32, i32)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = (sq % 8) as i32;
        let rank = (sq / 8) as i32;
        let mut attacks = 0u64;
        let mut i = 0usize;

        while i < offsets.len() {
            attacks |= set_if_valid(file + offsets[i].0, rank + offsets[i].1);
            i += 1;
        }

        table[sq] = attacks;
        sq += 1;
    }

    table
}

const fn set_if_valid(file: i32, rank: i32) -> u64 {
    if file < 0 || file > 7 || rank < 0 || rank > 7 {
        return 0;
    }

    let square = (rank as usize) * 8 + (file as usize);
    1u64 << square
}
