//! Targeted pseudo-legal move generation.
//!
//! `generate` emits every pseudo-legal move whose destination lies in a target
//! mask: all squares for full generation, enemy occupancy for captures-only, or
//! the checker-plus-ray mask for check evasions. Legality (own king not left
//! attacked) is decided after `make_move` by the caller, not here.

use std::sync::Arc;

use crate::errors::EngineResult;
use crate::game_state::chess_rules::{CastlePath, KINGSIDE_CASTLES, QUEENSIDE_CASTLES};
use crate::game_state::chess_types::*;
use crate::game_state::game_state::GameState;
use crate::moves::attack_tables::AttackTables;
use crate::moves::chess_move::*;

const NON_PAWN_PIECES: [PieceKind; 4] = [
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
];

#[derive(Debug, Clone)]
pub struct MoveGenerator {
    tables: Arc<AttackTables>,
}

impl MoveGenerator {
    pub fn new(tables: Arc<AttackTables>) -> Self {
        Self { tables }
    }

    #[inline]
    pub fn tables(&self) -> &AttackTables {
        &self.tables
    }

    /// Pseudo-legal moves landing in `target`. Castles are included when the
    /// king's destination is in `target`.
    pub fn generate(&self, state: &GameState, target: u64, moves: &mut Vec<Move>) {
        self.generate_pawn_moves(state, target, moves);
        for piece in NON_PAWN_PIECES {
            self.generate_piece_moves(state, piece, target, moves);
        }
        self.generate_piece_moves(state, PieceKind::King, target, moves);
        self.generate_castles(state, target, moves);
    }

    #[inline]
    pub fn generate_all(&self, state: &GameState, moves: &mut Vec<Move>) {
        self.generate(state, u64::MAX, moves);
    }

    /// Captures, capture-promotions and en passant.
    #[inline]
    pub fn generate_captures(&self, state: &GameState, moves: &mut Vec<Move>) {
        let them = state.side_to_move().opposite();
        self.generate(state, state.side_bitboard(them), moves);
    }

    /// Pseudo-legal replies to check.
    ///
    /// King steps are generated to every square. With a single checker the
    /// other pieces may only capture it or block the ray between it and the
    /// king. With two or more checkers only the king can move. Castling is
    /// never produced here.
    pub fn evade_checks(&self, state: &GameState, moves: &mut Vec<Move>) {
        let us = state.side_to_move();
        let king = state.king_square(us);
        self.generate_piece_moves(state, PieceKind::King, u64::MAX, moves);

        let checkers = self.attackers_to(state, king, us.opposite(), state.occupancy());
        if checkers.count_ones() != 1 {
            return;
        }

        let checker = checkers.trailing_zeros() as Square;
        let target = checkers | self.tables.between(king, checker);
        self.generate_pawn_moves(state, target, moves);
        for piece in NON_PAWN_PIECES {
            self.generate_piece_moves(state, piece, target, moves);
        }
    }

    /// Pieces of `by` attacking `square` given `occupancy` for slider rays.
    pub fn attackers_to(&self, state: &GameState, square: Square, by: Color, occupancy: u64) -> u64 {
        let tables = &self.tables;
        let diagonal = state.pieces_of(by, PieceKind::Bishop) | state.pieces_of(by, PieceKind::Queen);
        let straight = state.pieces_of(by, PieceKind::Rook) | state.pieces_of(by, PieceKind::Queen);

        (tables.pawn_attacks(by.opposite(), square) & state.pieces_of(by, PieceKind::Pawn))
            | (tables.knight_attacks(square) & state.pieces_of(by, PieceKind::Knight))
            | (tables.king_attacks(square) & state.pieces_of(by, PieceKind::King))
            | (tables.bishop_attacks(square, occupancy) & diagonal)
            | (tables.rook_attacks(square, occupancy) & straight)
    }

    #[inline]
    pub fn is_square_attacked(&self, state: &GameState, square: Square, by: Color) -> bool {
        self.attackers_to(state, square, by, state.occupancy()) != 0
    }

    /// True when the side to move is in check.
    #[inline]
    pub fn in_check(&self, state: &GameState) -> bool {
        let us = state.side_to_move();
        self.is_square_attacked(state, state.king_square(us), us.opposite())
    }

    /// After a move was made: true when the side that moved left its king safe.
    #[inline]
    pub fn mover_king_safe(&self, state: &GameState) -> bool {
        let them = state.side_to_move();
        let mover = them.opposite();
        !self.is_square_attacked(state, state.king_square(mover), them)
    }

    /// Make, test, and unmake a pseudo-legal move.
    pub fn is_legal(&self, state: &mut GameState, mv: Move) -> EngineResult<bool> {
        state.make_move(mv)?;
        let legal = self.mover_king_safe(state);
        state.undo_move(mv)?;
        Ok(legal)
    }

    pub fn legal_moves(&self, state: &mut GameState) -> EngineResult<Vec<Move>> {
        let mut moves = Vec::with_capacity(64);
        self.generate_all(state, &mut moves);
        let mut legal = Vec::with_capacity(moves.len());
        for mv in moves {
            if self.is_legal(state, mv)? {
                legal.push(mv);
            }
        }
        Ok(legal)
    }

    /// Whether `mv` is one of the pseudo-legal moves of the position, so a
    /// stale or colliding table move can never be played.
    pub fn validate(&self, state: &GameState, mv: Move) -> bool {
        if mv.is_null() {
            return false;
        }
        let from_bit = 1u64 << mv.from();
        if state.side_bitboard(state.side_to_move()) & from_bit == 0 {
            return false;
        }
        let mut moves = Vec::with_capacity(16);
        self.generate(state, 1u64 << mv.to(), &mut moves);
        moves.contains(&mv)
    }

    fn generate_piece_moves(&self, state: &GameState, piece: PieceKind, target: u64, moves: &mut Vec<Move>) {
        let us = state.side_to_move();
        let own = state.side_bitboard(us);
        let enemy = state.side_bitboard(us.opposite());
        let occupancy = own | enemy;

        let mut sources = state.pieces_of(us, piece);
        while sources != 0 {
            let from = sources.trailing_zeros() as Square;
            sources &= sources - 1;

            let reachable = self.tables.piece_attacks(piece, from, occupancy) & !own & target;
            push_targets(moves, from, reachable & enemy, FLAG_CAPTURE);
            push_targets(moves, from, reachable & !enemy, FLAG_QUIET);
        }
    }

    fn generate_pawn_moves(&self, state: &GameState, target: u64, moves: &mut Vec<Move>) {
        let us = state.side_to_move();
        let them = us.opposite();
        let pawns = state.pieces_of(us, PieceKind::Pawn);
        let enemy = state.side_bitboard(them);
        let empty = !state.occupancy();

        let (forward, double_rank, promotion_rank): (i8, u64, u64) = match us {
            Color::Light => (8, RANK_4, RANK_8),
            Color::Dark => (-8, RANK_5, RANK_1),
        };

        let single = shift(pawns, forward) & empty;
        let double = shift(single, forward) & empty & double_rank;
        let single = single & target;

        push_pawn_targets(moves, single & !promotion_rank, forward, FLAG_QUIET);
        push_promotions(moves, single & promotion_rank, forward, 0);
        push_pawn_targets(moves, double & target, 2 * forward, FLAG_DOUBLE_PAWN_PUSH);

        // West and east captures; the file masks stop a-file/h-file wraparound.
        for (file_guard, delta) in [(FILE_A, forward - 1), (FILE_H, forward + 1)] {
            let captures = shift(pawns & !file_guard, delta) & enemy & target;
            push_pawn_targets(moves, captures & !promotion_rank, delta, FLAG_CAPTURE);
            push_promotions(moves, captures & promotion_rank, delta, FLAG_CAPTURE);
        }

        if let Some(ep_square) = state.en_passant_square() {
            let victim = match us {
                Color::Light => ep_square - 8,
                Color::Dark => ep_square + 8,
            };
            let victim_bit = 1u64 << victim;
            let relevant = target & ((1u64 << ep_square) | victim_bit) != 0;
            if relevant && state.pieces_of(them, PieceKind::Pawn) & victim_bit != 0 {
                let mut attackers = self.tables.pawn_attacks(them, ep_square) & pawns;
                while attackers != 0 {
                    let from = attackers.trailing_zeros() as Square;
                    attackers &= attackers - 1;
                    moves.push(Move::new(from, ep_square, FLAG_EN_PASSANT));
                }
            }
        }
    }

    fn generate_castles(&self, state: &GameState, target: u64, moves: &mut Vec<Move>) {
        let us = state.side_to_move();
        let rights = state.castling_rights();
        for (path, flag) in [
            (&KINGSIDE_CASTLES[us.index()], FLAG_KING_CASTLE),
            (&QUEENSIDE_CASTLES[us.index()], FLAG_QUEEN_CASTLE),
        ] {
            if rights & path.right != 0
                && target & (1u64 << path.king_to) != 0
                && self.castle_path_clear(state, us, path)
            {
                moves.push(Move::new(path.king_from, path.king_to, flag));
            }
        }
    }

    fn castle_path_clear(&self, state: &GameState, us: Color, path: &CastlePath) -> bool {
        if state.king_square(us) != path.king_from
            || state.pieces_of(us, PieceKind::Rook) & (1u64 << path.rook_from) == 0
            || state.occupancy() & path.empty_mask != 0
        {
            return false;
        }
        let them = us.opposite();
        path.safe_squares
            .iter()
            .all(|&sq| !self.is_square_attacked(state, sq, them))
    }
}

#[inline]
fn shift(bb: u64, delta: i8) -> u64 {
    if delta >= 0 {
        bb << delta
    } else {
        bb >> -delta
    }
}

#[inline]
fn push_targets(moves: &mut Vec<Move>, from: Square, mut targets: u64, flag: u16) {
    while targets != 0 {
        let to = targets.trailing_zeros() as Square;
        targets &= targets - 1;
        moves.push(Move::new(from, to, flag));
    }
}

/// `delta` is the signed step from origin to destination.
#[inline]
fn push_pawn_targets(moves: &mut Vec<Move>, mut targets: u64, delta: i8, flag: u16) {
    while targets != 0 {
        let to = targets.trailing_zeros() as Square;
        targets &= targets - 1;
        moves.push(Move::new((to as i8 - delta) as Square, to, flag));
    }
}

#[inline]
fn push_promotions(moves: &mut Vec<Move>, mut targets: u64, delta: i8, capture_flag: u16) {
    while targets != 0 {
        let to = targets.trailing_zeros() as Square;
        targets &= targets - 1;
        let from = (to as i8 - delta) as Square;
        for flag in PROMOTION_FLAGS {
            moves.push(Move::new(from, to, flag | capture_flag));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::MoveGenerator;
    use crate::game_state::chess_types::*;
    use crate::game_state::game_state::GameState;
    use crate::moves::attack_tables::AttackTables;
    use crate::moves::chess_move::*;
    use crate::search::zobrist::ZobristKeys;

    fn setup(fen: &str) -> (MoveGenerator, GameState) {
        let generator = MoveGenerator::new(Arc::new(AttackTables::new()));
        let state = GameState::from_fen(fen, Arc::new(ZobristKeys::new())).expect("FEN should parse");
        (generator, state)
    }

    fn legal_set(generator: &MoveGenerator, state: &mut GameState, moves: Vec<Move>) -> HashSet<Move> {
        moves
            .into_iter()
            .filter(|&mv| generator.is_legal(state, mv).expect("legality check"))
            .collect()
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        let (generator, state) = setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let mut moves = Vec::new();
        generator.generate_all(&state, &mut moves);
        assert_eq!(moves.len(), 20);
        assert_eq!(moves.iter().filter(|mv| mv.is_double_push()).count(), 8);
    }

    #[test]
    fn captures_only_generation_uses_enemy_target() {
        let (generator, state) = setup("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        let mut moves = Vec::new();
        generator.generate_captures(&state, &mut moves);
        assert_eq!(moves, vec![Move::new(28, 35, FLAG_CAPTURE)]);
    }

    #[test]
    fn promotions_generate_all_four_pieces() {
        let (generator, state) = setup("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let mut moves = Vec::new();
        generator.generate_all(&state, &mut moves);
        let promotions: Vec<Move> = moves.into_iter().filter(|mv| mv.is_promotion()).collect();
        assert_eq!(promotions.len(), 8);
        assert_eq!(promotions.iter().filter(|mv| mv.is_capture()).count(), 4);
    }

    #[test]
    fn castling_requires_empty_and_unattacked_path() {
        let (generator, state) = setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mut moves = Vec::new();
        generator.generate_all(&state, &mut moves);
        assert!(moves.contains(&Move::new(4, 6, FLAG_KING_CASTLE)));
        assert!(moves.contains(&Move::new(4, 2, FLAG_QUEEN_CASTLE)));

        // Dark rook on f8 covers f1, so kingside castling is unavailable.
        let (generator, state) = setup("r3kr2/8/8/8/8/8/8/R3K2R w KQq - 0 1");
        let mut moves = Vec::new();
        generator.generate_all(&state, &mut moves);
        assert!(!moves.contains(&Move::new(4, 6, FLAG_KING_CASTLE)));
        assert!(moves.contains(&Move::new(4, 2, FLAG_QUEEN_CASTLE)));

        // A piece on b1 blocks queenside even though b1 need not be safe.
        let (generator, state) = setup("r3k2r/8/8/8/8/8/8/RN2K2R w KQkq - 0 1");
        let mut moves = Vec::new();
        generator.generate_all(&state, &mut moves);
        assert!(!moves.contains(&Move::new(4, 2, FLAG_QUEEN_CASTLE)));
    }

    #[test]
    fn square_attack_detection() {
        let (generator, state) = setup("4k3/8/8/8/8/8/3p4/R3K3 w - - 0 1");
        assert!(generator.is_square_attacked(&state, 4, Color::Dark));
        assert!(generator.in_check(&state));
        assert!(generator.is_square_attacked(&state, 56, Color::Light));
        assert!(!generator.is_square_attacked(&state, 20, Color::Dark));
    }

    #[test]
    fn double_check_only_yields_king_moves() {
        let (generator, mut state) = setup("4r2k/8/8/8/8/R2n4/8/4K3 w - - 0 1");
        assert!(generator.in_check(&state));
        let mut evasions = Vec::new();
        generator.evade_checks(&state, &mut evasions);
        assert!(evasions.iter().all(|mv| mv.from() == 4));

        let legal = legal_set(&generator, &mut state, evasions);
        let expected: HashSet<Move> = [
            Move::new(4, 3, FLAG_QUIET),
            Move::new(4, 11, FLAG_QUIET),
            Move::new(4, 5, FLAG_QUIET),
        ]
        .into_iter()
        .collect();
        assert_eq!(legal, expected);
    }

    #[test]
    fn evasions_match_filtered_full_generation() {
        let fens = [
            "4r2k/8/8/8/8/R2n4/8/4K3 w - - 0 1",
            "4k3/8/8/8/1b6/8/8/RN2K2R w KQ - 0 1",
            "8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1",
            "rnbqkbnr/ppppp1pp/8/5p1Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2",
            "r3k2r/p1pp1pb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBqPPP/R3K2R w KQkq - 0 1",
        ];
        for fen in fens {
            let (generator, mut state) = setup(fen);
            assert!(generator.in_check(&state), "{fen} should be check");

            let mut evasions = Vec::new();
            generator.evade_checks(&state, &mut evasions);
            let mut all = Vec::new();
            generator.generate_all(&state, &mut all);

            let from_evasions = legal_set(&generator, &mut state, evasions);
            let from_all = legal_set(&generator, &mut state, all);
            assert_eq!(from_evasions, from_all, "evasion mismatch in {fen}");
        }
    }

    #[test]
    fn en_passant_can_capture_a_checking_pawn() {
        let (generator, state) = setup("8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1");
        let mut evasions = Vec::new();
        generator.evade_checks(&state, &mut evasions);
        assert!(evasions.contains(&Move::new(28, 19, FLAG_EN_PASSANT)));
    }

    #[test]
    fn validate_accepts_generated_and_rejects_foreign_moves() {
        let (generator, state) = setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(generator.validate(&state, Move::new(12, 28, FLAG_DOUBLE_PAWN_PUSH)));
        assert!(generator.validate(&state, Move::new(6, 21, FLAG_QUIET)));
        assert!(!generator.validate(&state, Move::new(12, 28, FLAG_QUIET)));
        assert!(!generator.validate(&state, Move::new(52, 36, FLAG_DOUBLE_PAWN_PUSH)));
        assert!(!generator.validate(&state, Move::new(4, 6, FLAG_KING_CASTLE)));
        assert!(!generator.validate(&state, Move::NULL));
    }
}
