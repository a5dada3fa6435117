//! Coordinate move text (`e2e4`, `e7e8q`) resolved against the live position.

use crate::errors::{EngineError, EngineResult};
use crate::game_state::chess_types::PieceKind;
use crate::game_state::game_state::GameState;
use crate::move_generation::move_generator::MoveGenerator;
use crate::moves::chess_move::Move;
use crate::utils::algebraic::algebraic_to_square;

/// Find the legal move written as `text`. The position is restored before
/// returning, whatever the outcome.
pub fn long_algebraic_to_move(
    text: &str,
    game_state: &mut GameState,
    generator: &MoveGenerator,
) -> EngineResult<Move> {
    let invalid = || EngineError::InvalidMove(text.to_owned());
    if !text.is_ascii() || (text.len() != 4 && text.len() != 5) {
        return Err(invalid());
    }

    let from = algebraic_to_square(&text[0..2]).map_err(|_| invalid())?;
    let to = algebraic_to_square(&text[2..4]).map_err(|_| invalid())?;
    let promotion = match text.as_bytes().get(4) {
        None => None,
        Some(&ch) => Some(char_to_promotion(ch as char).ok_or_else(invalid)?),
    };

    let mut moves = Vec::with_capacity(16);
    generator.generate(game_state, 1u64 << to, &mut moves);
    let candidate = moves
        .into_iter()
        .find(|mv| mv.from() == from && mv.to() == to && mv.promotion_piece() == promotion)
        .ok_or_else(invalid)?;

    if generator.is_legal(game_state, candidate)? {
        Ok(candidate)
    } else {
        Err(invalid())
    }
}

fn char_to_promotion(ch: char) -> Option<PieceKind> {
    match ch.to_ascii_lowercase() {
        'n' => Some(PieceKind::Knight),
        'b' => Some(PieceKind::Bishop),
        'r' => Some(PieceKind::Rook),
        'q' => Some(PieceKind::Queen),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::long_algebraic_to_move;
    use crate::game_state::game_state::GameState;
    use crate::move_generation::move_generator::MoveGenerator;
    use crate::moves::attack_tables::AttackTables;
    use crate::search::zobrist::ZobristKeys;

    fn setup(fen: &str) -> (MoveGenerator, GameState) {
        let generator = MoveGenerator::new(Arc::new(AttackTables::new()));
        let state = GameState::from_fen(fen, Arc::new(ZobristKeys::new())).expect("FEN should parse");
        (generator, state)
    }

    #[test]
    fn resolves_flags_from_the_position() {
        let (generator, mut state) = setup("r3k2r/8/8/8/8/8/4P3/R3K2R w KQkq - 0 1");
        let push = long_algebraic_to_move("e2e4", &mut state, &generator).expect("push should resolve");
        assert!(push.is_double_push());
        let castle = long_algebraic_to_move("e1g1", &mut state, &generator).expect("castle should resolve");
        assert!(castle.is_castle());

        let (generator, mut state) = setup("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        let ep = long_algebraic_to_move("e5d6", &mut state, &generator).expect("en passant should resolve");
        assert!(ep.is_en_passant());
    }

    #[test]
    fn promotion_suffix_selects_piece() {
        let (generator, mut state) = setup("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let mv = long_algebraic_to_move("a7a8n", &mut state, &generator).expect("promotion should resolve");
        assert_eq!(mv.to_long_algebraic(), "a7a8n");
        assert!(long_algebraic_to_move("a7a8", &mut state, &generator).is_err());
        assert!(long_algebraic_to_move("a7a8k", &mut state, &generator).is_err());
    }

    #[test]
    fn rejects_illegal_and_malformed_moves() {
        let (generator, mut state) = setup("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
        let before = state.clone();
        assert!(long_algebraic_to_move("e1d1", &mut state, &generator).is_ok());
        assert!(long_algebraic_to_move("e1e2", &mut state, &generator).is_ok());
        assert!(long_algebraic_to_move("e1f1", &mut state, &generator).is_ok());
        // Squares on the rook's rank stay attacked.
        assert!(long_algebraic_to_move("e1d2", &mut state, &generator).is_err());
        assert!(long_algebraic_to_move("e1f2", &mut state, &generator).is_err());
        assert!(long_algebraic_to_move("e1e3", &mut state, &generator).is_err());
        assert!(long_algebraic_to_move("zz", &mut state, &generator).is_err());
        assert!(long_algebraic_to_move("e1é1", &mut state, &generator).is_err());
        assert_eq!(state, before);
    }
}
