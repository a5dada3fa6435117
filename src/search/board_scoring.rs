//! Pluggable static evaluation.
//!
//! Search delegates leaf scoring to a `BoardScorer`, passing the game phase
//! derived from the running material total so scorers can blend middlegame and
//! endgame terms without recounting pieces.

use crate::game_state::{chess_types::*, game_state::GameState};

/// Non-king material at or above which the position counts as full middlegame.
pub const PHASE_MATERIAL_CAP: i32 = 8000;

pub trait BoardScorer: Send + Sync {
    /// Score from the perspective of the side to move. `phase` runs from 0
    /// (bare kings) to 100 (full material).
    fn score(&self, game_state: &GameState, phase: i32) -> i32;
}

/// `100 * min(material, 8000) / 8000` over both sides' non-king material.
#[inline]
pub fn game_phase(game_state: &GameState) -> i32 {
    100 * game_state.material().min(PHASE_MATERIAL_CAP) / PHASE_MATERIAL_CAP
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialScorer;

impl BoardScorer for MaterialScorer {
    fn score(&self, game_state: &GameState, _phase: i32) -> i32 {
        side_relative(game_state, material_balance_white_minus_black(game_state))
    }
}

/// Material plus piece-square terms, tapered between middlegame and endgame
/// weights by phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaperedPstScorer;

impl TaperedPstScorer {
    const KING_ACTIVITY_WEIGHT: i32 = 6;
    const PASSED_PAWN_STEP: i32 = 12;

    fn middlegame_white_minus_black(game_state: &GameState) -> i32 {
        let mut score = 0i32;
        for color in [Color::Light, Color::Dark] {
            let sign = if color == Color::Light { 1 } else { -1 };
            for piece in PieceKind::ALL {
                let mut bb = game_state.pieces_of(color, piece);
                while bb != 0 {
                    let sq = bb.trailing_zeros() as u8;
                    score += sign * piece_square_bonus(piece, color, sq);
                    bb &= bb - 1;
                }
            }
        }
        score
    }

    fn endgame_white_minus_black(game_state: &GameState) -> i32 {
        let mut score = 0i32;
        for color in [Color::Light, Color::Dark] {
            let sign = if color == Color::Light { 1 } else { -1 };
            let king = game_state.king_square(color);
            score += sign * Self::KING_ACTIVITY_WEIGHT * (6 - center_distance(king));

            let enemy_pawns = game_state.pieces_of(color.opposite(), PieceKind::Pawn);
            let mut pawns = game_state.pieces_of(color, PieceKind::Pawn);
            while pawns != 0 {
                let sq = pawns.trailing_zeros() as u8;
                let advance = relative_rank(color, sq);
                score += sign * advance * 4;
                if is_passed_pawn(color, sq, enemy_pawns) {
                    score += sign * (advance + 1) * Self::PASSED_PAWN_STEP;
                }
                pawns &= pawns - 1;
            }
        }
        score
    }
}

impl BoardScorer for TaperedPstScorer {
    fn score(&self, game_state: &GameState, phase: i32) -> i32 {
        let phase = phase.clamp(0, 100);
        let material = material_balance_white_minus_black(game_state);
        let middlegame = Self::middlegame_white_minus_black(game_state);
        let endgame = Self::endgame_white_minus_black(game_state);
        let tapered = (middlegame * phase + endgame * (100 - phase)) / 100;
        side_relative(game_state, material + tapered)
    }
}

#[inline]
fn side_relative(game_state: &GameState, white_minus_black: i32) -> i32 {
    match game_state.side_to_move() {
        Color::Light => white_minus_black,
        Color::Dark => -white_minus_black,
    }
}

fn material_balance_white_minus_black(game_state: &GameState) -> i32 {
    PieceKind::ALL
        .into_iter()
        .map(|piece| {
            let white = game_state.pieces_of(Color::Light, piece).count_ones() as i32;
            let black = game_state.pieces_of(Color::Dark, piece).count_ones() as i32;
            (white - black) * piece.material_value()
        })
        .sum()
}

#[inline]
fn relative_rank(color: Color, sq: u8) -> i32 {
    let rank = i32::from(rank_of(sq));
    match color {
        Color::Light => rank,
        Color::Dark => 7 - rank,
    }
}

#[inline]
fn center_distance(sq: u8) -> i32 {
    let file = i32::from(file_of(sq));
    let rank = i32::from(rank_of(sq));
    let file_dist = if file < 4 { 3 - file } else { file - 4 };
    let rank_dist = if rank < 4 { 3 - rank } else { rank - 4 };
    file_dist + rank_dist
}

fn piece_square_bonus(piece: PieceKind, color: Color, sq: u8) -> i32 {
    let file = i32::from(file_of(sq));
    let r = relative_rank(color, sq);
    let center_bonus = 4 - ((file - 3).abs() + (r - 3).abs());

    match piece {
        PieceKind::Pawn => r * 8 - (file - 3).abs() * 2,
        PieceKind::Knight => center_bonus * 6,
        PieceKind::Bishop => center_bonus * 4 + r,
        PieceKind::Rook => r * 2,
        PieceKind::Queen => center_bonus * 2,
        PieceKind::King => {
            // Castled or edge king on the back ranks.
            if r <= 1 {
                8 - (file - 4).abs() * 2
            } else {
                -center_bonus * 4
            }
        }
    }
}

fn is_passed_pawn(color: Color, sq: u8, enemy_pawns: u64) -> bool {
    let file = i32::from(file_of(sq));
    let rank = i32::from(rank_of(sq));

    let mut span = 0u64;
    for f in (file - 1).max(0)..=(file + 1).min(7) {
        let ranks = match color {
            Color::Light => (rank + 1)..8,
            Color::Dark => 0..rank,
        };
        for r in ranks {
            span |= 1u64 << (r * 8 + f);
        }
    }
    enemy_pawns & span == 0
}
