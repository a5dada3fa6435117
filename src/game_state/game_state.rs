//! Core incremental board state representation.
//!
//! `GameState` is the position the search walks: six piece-kind bitboards, two
//! side occupancies, a stack of packed irreversible-state words (one per ply),
//! an incrementally maintained Zobrist key, and a running material total.
//!
//! All mutation goes through `make_move` / `undo_move`, which must be called in
//! strict LIFO order with the same move value. Both directions apply the same
//! XOR toggles, so undo is the exact inverse of make.

use std::sync::Arc;

use crate::errors::{EngineError, EngineResult};
use crate::game_state::chess_rules::{CASTLING_KEEP_MASK, KINGSIDE_CASTLES, QUEENSIDE_CASTLES};
use crate::game_state::chess_types::*;
use crate::game_state::state_word::StateWord;
use crate::moves::chess_move::{Move, FLAG_KING_CASTLE};
use crate::search::zobrist::ZobristKeys;
use crate::utils::fen_generator::generate_fen;
use crate::utils::fen_parser::parse_fen;

const START_PIECES: [u64; 6] = [
    0x00FF_0000_0000_FF00,
    0x4200_0000_0000_0042,
    0x2400_0000_0000_0024,
    0x8100_0000_0000_0081,
    0x0800_0000_0000_0008,
    0x1000_0000_0000_0010,
];
const START_SIDES: [u64; 2] = [0x0000_0000_0000_FFFF, 0xFFFF_0000_0000_0000];

#[derive(Debug, Clone)]
pub struct GameState {
    // [piece_kind]
    pieces: [u64; 6],
    // [color]
    sides: [u64; 2],

    // Never empty; the last entry is the live state.
    state_stack: Vec<StateWord>,

    zobrist_key: u64,
    material: i32,
    start_fullmove: u16,

    keys: Arc<ZobristKeys>,
}

impl GameState {
    /// Standard starting position.
    pub fn new_game(keys: Arc<ZobristKeys>) -> Self {
        let mut state = StateWord::default();
        state.set_castling_rights(CASTLE_ALL);
        state.set_king_square(Color::Light, 4);
        state.set_king_square(Color::Dark, 60);
        Self::from_parts(START_PIECES, START_SIDES, state, 1, keys)
    }

    #[inline]
    pub fn from_fen(fen: &str, keys: Arc<ZobristKeys>) -> EngineResult<Self> {
        parse_fen(fen, keys)
    }

    #[inline]
    pub fn get_fen(&self) -> String {
        generate_fen(self)
    }

    /// Assemble a position from raw boards; material and hash are derived.
    pub(crate) fn from_parts(
        pieces: [u64; 6],
        sides: [u64; 2],
        state: StateWord,
        fullmove_number: u16,
        keys: Arc<ZobristKeys>,
    ) -> Self {
        let mut game_state = Self {
            pieces,
            sides,
            state_stack: Vec::with_capacity(256),
            zobrist_key: 0,
            material: 0,
            start_fullmove: fullmove_number.max(1),
            keys,
        };
        game_state.state_stack.push(state);
        game_state.material = game_state.compute_material();
        game_state.zobrist_key = game_state.compute_hash();
        game_state
    }

    // --- Accessors ---

    #[inline]
    pub fn pieces(&self, piece: PieceKind) -> u64 {
        self.pieces[piece.index()]
    }

    #[inline]
    pub fn side_bitboard(&self, color: Color) -> u64 {
        self.sides[color.index()]
    }

    #[inline]
    pub fn pieces_of(&self, color: Color, piece: PieceKind) -> u64 {
        self.pieces[piece.index()] & self.sides[color.index()]
    }

    #[inline]
    pub fn occupancy(&self) -> u64 {
        self.sides[0] | self.sides[1]
    }

    #[inline]
    pub fn state(&self) -> StateWord {
        // The stack is seeded on construction and `undo_move` never pops the seed.
        self.state_stack.last().copied().unwrap_or_default()
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.state().side_to_move()
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.state().castling_rights()
    }

    #[inline]
    pub fn en_passant_square(&self) -> Option<Square> {
        self.state().en_passant_square()
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.state().king_square(color)
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.state().halfmove_clock()
    }

    /// Piece removed by the last move, if any.
    #[inline]
    pub fn last_captured(&self) -> Option<PieceKind> {
        self.state().captured_piece()
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        let base_offset = self.state_stack[0].side_to_move().index();
        let plies = self.plies_played() + base_offset;
        self.start_fullmove.saturating_add((plies / 2) as u16)
    }

    #[inline]
    pub fn plies_played(&self) -> usize {
        self.state_stack.len() - 1
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.zobrist_key
    }

    /// Non-king material of both sides.
    #[inline]
    pub fn material(&self) -> i32 {
        self.material
    }

    #[inline]
    pub fn keys(&self) -> &Arc<ZobristKeys> {
        &self.keys
    }

    pub fn piece_kind_on(&self, square: Square) -> Option<PieceKind> {
        let bit = 1u64 << square;
        PieceKind::ALL
            .into_iter()
            .find(|piece| self.pieces[piece.index()] & bit != 0)
    }

    pub fn piece_on(&self, square: Square) -> Option<(Color, PieceKind)> {
        let bit = 1u64 << square;
        let color = if self.sides[0] & bit != 0 {
            Color::Light
        } else if self.sides[1] & bit != 0 {
            Color::Dark
        } else {
            return None;
        };
        self.piece_kind_on(square).map(|piece| (color, piece))
    }

    // --- Make / unmake ---

    pub fn make_move(&mut self, mv: Move) -> EngineResult<()> {
        let prev = self.state();
        let us = prev.side_to_move();
        let from = mv.from();
        let to = mv.to();

        let moved = self.piece_kind_on(from).ok_or(EngineError::MissingPiece {
            square: from,
            context: "making a move",
        })?;
        let captured = if mv.is_en_passant() {
            Some(PieceKind::Pawn)
        } else if mv.is_capture() {
            Some(self.piece_kind_on(to).ok_or(EngineError::MissingPiece {
                square: to,
                context: "capturing",
            })?)
        } else {
            None
        };

        let mut next = prev;
        next.clear_en_passant();
        next.set_captured_piece(captured);
        next.set_castling_rights(
            prev.castling_rights() & CASTLING_KEEP_MASK[from as usize] & CASTLING_KEEP_MASK[to as usize],
        );
        if moved == PieceKind::Pawn || captured.is_some() {
            next.reset_halfmove_clock();
        } else {
            next.increment_halfmove_clock();
        }
        if moved == PieceKind::King {
            next.set_king_square(us, to);
        }
        if mv.is_double_push() {
            next.set_en_passant_file(file_of(to));
        }
        next.toggle_side_to_move();

        self.toggle_move_pieces(us, mv, moved, captured);
        self.zobrist_key ^= self.keys.state_key(prev) ^ self.keys.state_key(next);
        self.state_stack.push(next);
        Ok(())
    }

    pub fn undo_move(&mut self, mv: Move) -> EngineResult<()> {
        if self.state_stack.len() < 2 {
            return Err(EngineError::EmptyHistory);
        }
        let undone = self.state();
        let moved = if mv.is_promotion() {
            PieceKind::Pawn
        } else {
            self.piece_kind_on(mv.to()).ok_or(EngineError::MissingPiece {
                square: mv.to(),
                context: "undoing a move",
            })?
        };

        self.state_stack.pop();
        let prev = self.state();
        self.toggle_move_pieces(prev.side_to_move(), mv, moved, undone.captured_piece());
        self.zobrist_key ^= self.keys.state_key(prev) ^ self.keys.state_key(undone);
        Ok(())
    }

    fn toggle_move_pieces(
        &mut self,
        us: Color,
        mv: Move,
        moved: PieceKind,
        captured: Option<PieceKind>,
    ) {
        let from = mv.from();
        let to = mv.to();

        if let Some(victim) = captured {
            let victim_square = if mv.is_en_passant() {
                match us {
                    Color::Light => to - 8,
                    Color::Dark => to + 8,
                }
            } else {
                to
            };
            self.toggle_piece(us.opposite(), victim, victim_square);
        }

        self.toggle_piece(us, moved, from);
        self.toggle_piece(us, mv.promotion_piece().unwrap_or(moved), to);

        if mv.is_castle() {
            let path = if mv.flag() == FLAG_KING_CASTLE {
                KINGSIDE_CASTLES[us.index()]
            } else {
                QUEENSIDE_CASTLES[us.index()]
            };
            self.toggle_piece(us, PieceKind::Rook, path.rook_from);
            self.toggle_piece(us, PieceKind::Rook, path.rook_to);
        }
    }

    #[inline]
    fn toggle_piece(&mut self, color: Color, piece: PieceKind, square: Square) {
        let bit = 1u64 << square;
        if self.pieces[piece.index()] & bit != 0 {
            self.material -= piece.material_value();
        } else {
            self.material += piece.material_value();
        }
        self.pieces[piece.index()] ^= bit;
        self.sides[color.index()] ^= bit;
        self.zobrist_key ^= self.keys.piece_square(color, piece, square);
    }

    // --- From-scratch recomputation ---

    /// Hash of the current boards and live state, computed without the incremental key.
    pub fn compute_hash(&self) -> u64 {
        let mut key = self.keys.state_key(self.state());
        for color in [Color::Light, Color::Dark] {
            for piece in PieceKind::ALL {
                let mut bb = self.pieces_of(color, piece);
                while bb != 0 {
                    let sq = bb.trailing_zeros() as Square;
                    key ^= self.keys.piece_square(color, piece, sq);
                    bb &= bb - 1;
                }
            }
        }
        key
    }

    fn compute_material(&self) -> i32 {
        PieceKind::ALL
            .into_iter()
            .map(|piece| self.pieces(piece).count_ones() as i32 * piece.material_value())
            .sum()
    }

    /// Board invariants: sides are disjoint and partition the piece boards,
    /// piece boards are disjoint, cached king squares and material agree.
    pub fn is_consistent(&self) -> bool {
        let mut union = 0u64;
        for piece in PieceKind::ALL {
            if union & self.pieces(piece) != 0 {
                return false;
            }
            union |= self.pieces(piece);
        }
        let kings_match = [Color::Light, Color::Dark].into_iter().all(|color| {
            let king = self.pieces_of(color, PieceKind::King);
            king == 0 || king == 1u64 << self.king_square(color)
        });
        self.sides[0] & self.sides[1] == 0
            && union == self.occupancy()
            && kings_match
            && self.material == self.compute_material()
            && self.zobrist_key == self.compute_hash()
    }
}

/// Positions are equal when boards and side/castling/en-passant state agree.
/// The halfmove clock and captured-piece field are ignored.
impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.pieces == other.pieces
            && self.sides == other.sides
            && self.state().reversible_bits() == other.state().reversible_bits()
    }
}

impl Eq for GameState {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::GameState;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::game_state::chess_types::*;
    use crate::move_generation::move_generator::MoveGenerator;
    use crate::moves::attack_tables::AttackTables;
    use crate::moves::chess_move::*;
    use crate::search::zobrist::ZobristKeys;

    fn keys() -> Arc<ZobristKeys> {
        Arc::new(ZobristKeys::new())
    }

    fn generator() -> MoveGenerator {
        MoveGenerator::new(Arc::new(AttackTables::new()))
    }

    #[test]
    fn new_game_matches_starting_fen() {
        let keys = keys();
        let built = GameState::new_game(Arc::clone(&keys));
        let parsed = GameState::from_fen(STARTING_POSITION_FEN, keys).expect("FEN should parse");
        assert_eq!(built, parsed);
        assert_eq!(built.hash(), parsed.hash());
        assert_eq!(built.get_fen(), STARTING_POSITION_FEN);
        assert_eq!(built.material(), 2 * (8 * 100 + 2 * 300 + 2 * 300 + 2 * 500 + 1000));
        assert!(built.is_consistent());
    }

    #[test]
    fn make_undo_is_exact_inverse_for_every_move_family() {
        let fens = [
            STARTING_POSITION_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
        ];
        let generator = generator();
        let keys = keys();
        for fen in fens {
            let mut game = GameState::from_fen(fen, Arc::clone(&keys)).expect("FEN should parse");
            let before = game.clone();
            let mut moves = Vec::new();
            generator.generate_all(&game, &mut moves);
            assert!(!moves.is_empty());
            for mv in moves {
                game.make_move(mv).expect("move should apply");
                assert!(game.is_consistent(), "inconsistent after {mv} in {fen}");
                game.undo_move(mv).expect("move should undo");
                assert_eq!(game, before, "undo mismatch for {mv} in {fen}");
                assert_eq!(game.hash(), before.hash());
                assert_eq!(game.halfmove_clock(), before.halfmove_clock());
                assert_eq!(game.material(), before.material());
                assert_eq!(game.get_fen(), before.get_fen());
            }
        }
    }

    #[test]
    fn hash_stays_consistent_through_a_random_walk() {
        let generator = generator();
        let mut game = GameState::new_game(keys());
        let mut played = Vec::new();
        let mut seed = 0x2545_F491_4F6C_DD1Du64;
        for _ in 0..120 {
            let mut moves = Vec::new();
            generator.generate_all(&game, &mut moves);
            let legal: Vec<Move> = moves
                .into_iter()
                .filter(|&mv| generator.is_legal(&mut game, mv).expect("legality check"))
                .collect();
            if legal.is_empty() {
                break;
            }
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let mv = legal[(seed % legal.len() as u64) as usize];
            game.make_move(mv).expect("move should apply");
            assert_eq!(game.hash(), game.compute_hash());
            played.push(mv);
        }
        while let Some(mv) = played.pop() {
            game.undo_move(mv).expect("move should undo");
            assert_eq!(game.hash(), game.compute_hash());
        }
        assert_eq!(game, GameState::new_game(keys()));
    }

    #[test]
    fn opening_sequence_updates_side_clock_and_knight() {
        let mut game = GameState::new_game(keys());
        game.make_move(Move::new(12, 28, FLAG_DOUBLE_PAWN_PUSH)).expect("e2e4");
        assert_eq!(game.en_passant_square(), Some(20));
        game.make_move(Move::new(52, 36, FLAG_DOUBLE_PAWN_PUSH)).expect("e7e5");
        game.make_move(Move::new(6, 21, FLAG_QUIET)).expect("g1f3");

        assert_eq!(game.side_to_move(), Color::Dark);
        assert_eq!(game.halfmove_clock(), 1);
        assert_eq!(game.en_passant_square(), None);
        let knights = game.pieces_of(Color::Light, PieceKind::Knight);
        assert_ne!(knights & (1u64 << 21), 0);
        assert_eq!(knights & (1u64 << 6), 0);
        assert_eq!(game.plies_played(), 3);
        assert_eq!(game.fullmove_number(), 2);
    }

    #[test]
    fn castling_moves_rook_and_clears_rights() {
        let mut game = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 3 1", keys())
            .expect("FEN should parse");
        let castle = Move::new(4, 6, FLAG_KING_CASTLE);
        game.make_move(castle).expect("castle should apply");
        assert_ne!(game.pieces_of(Color::Light, PieceKind::Rook) & (1u64 << 5), 0);
        assert_eq!(game.pieces_of(Color::Light, PieceKind::Rook) & (1u64 << 7), 0);
        assert_eq!(game.king_square(Color::Light), 6);
        assert_eq!(
            game.castling_rights(),
            CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE
        );
        assert_eq!(game.halfmove_clock(), 4);
        game.undo_move(castle).expect("castle should undo");
        assert_eq!(game.castling_rights(), CASTLE_ALL);
        assert_eq!(game.king_square(Color::Light), 4);
    }

    #[test]
    fn rook_capture_on_corner_revokes_enemy_right() {
        let mut game = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", keys())
            .expect("FEN should parse");
        let capture = Move::new(7, 63, FLAG_CAPTURE);
        game.make_move(capture).expect("capture should apply");
        assert_eq!(game.castling_rights(), CASTLE_LIGHT_QUEENSIDE | CASTLE_DARK_QUEENSIDE);
        assert_eq!(game.last_captured(), Some(PieceKind::Rook));
        assert_eq!(game.material(), 3 * 500);
    }

    #[test]
    fn promotion_capture_updates_material() {
        let mut game =
            GameState::from_fen("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1", keys()).expect("FEN should parse");
        let before = game.material();
        let mv = Move::new(48, 57, FLAG_QUEEN_PROMOTION_CAPTURE);
        game.make_move(mv).expect("promotion should apply");
        assert_eq!(game.material(), before - 100 - 300 + 1000);
        assert_eq!(game.piece_on(57), Some((Color::Light, PieceKind::Queen)));
        game.undo_move(mv).expect("promotion should undo");
        assert_eq!(game.piece_on(48), Some((Color::Light, PieceKind::Pawn)));
        assert_eq!(game.piece_on(57), Some((Color::Dark, PieceKind::Knight)));
    }

    #[test]
    fn en_passant_removes_pawn_behind_target() {
        let mut game = GameState::from_fen(
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            keys(),
        )
        .expect("FEN should parse");
        let mv = Move::new(36, 45, FLAG_EN_PASSANT);
        game.make_move(mv).expect("en passant should apply");
        assert_eq!(game.piece_on(37), None);
        assert_eq!(game.piece_on(45), Some((Color::Light, PieceKind::Pawn)));
        assert_eq!(game.last_captured(), Some(PieceKind::Pawn));
    }

    #[test]
    fn undo_without_history_is_an_error() {
        let mut game = GameState::new_game(keys());
        assert!(game.undo_move(Move::new(12, 28, FLAG_DOUBLE_PAWN_PUSH)).is_err());
        assert!(game.make_move(Move::new(20, 28, FLAG_QUIET)).is_err());
        assert_eq!(game, GameState::new_game(keys()));
    }

    #[test]
    fn equality_ignores_halfmove_clock() {
        let a = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1", keys()).expect("FEN should parse");
        let b = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 17 9", keys()).expect("FEN should parse");
        let c = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1", keys()).expect("FEN should parse");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
