//! Perft move-path enumeration for generator correctness checks.
//!
//! Walks the tree with make/unmake on a single `GameState`, keeping only moves
//! that survive the post-make king-safety test, and counts leaf nodes plus a
//! breakdown of the final-ply move kinds.

use crate::errors::EngineResult;
use crate::game_state::game_state::GameState;
use crate::move_generation::move_generator::MoveGenerator;
use crate::moves::chess_move::Move;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
        self.checks += rhs.checks;
    }
}

pub fn perft(generator: &MoveGenerator, game_state: &mut GameState, depth: u8) -> EngineResult<PerftCounts> {
    let mut counts = PerftCounts::default();
    if depth == 0 {
        counts.nodes = 1;
        return Ok(counts);
    }
    perft_recurse(generator, game_state, depth, &mut counts)?;
    Ok(counts)
}

/// Leaf count below each legal root move, in generation order.
pub fn divide(generator: &MoveGenerator, game_state: &mut GameState, depth: u8) -> EngineResult<Vec<(Move, u64)>> {
    let mut out = Vec::new();
    if depth == 0 {
        return Ok(out);
    }

    for mv in generator.legal_moves(game_state)? {
        game_state.make_move(mv)?;
        let below = perft(generator, game_state, depth - 1);
        game_state.undo_move(mv)?;
        out.push((mv, below?.nodes));
    }
    Ok(out)
}

fn perft_recurse(
    generator: &MoveGenerator,
    game_state: &mut GameState,
    depth: u8,
    counts: &mut PerftCounts,
) -> EngineResult<()> {
    let mut moves = Vec::with_capacity(64);
    generator.generate_all(game_state, &mut moves);

    for mv in moves {
        game_state.make_move(mv)?;
        if generator.mover_king_safe(game_state) {
            if depth == 1 {
                let mut leaf = PerftCounts {
                    nodes: 1,
                    ..PerftCounts::default()
                };
                leaf.captures = u64::from(mv.is_capture());
                leaf.en_passant = u64::from(mv.is_en_passant());
                leaf.castles = u64::from(mv.is_castle());
                leaf.promotions = u64::from(mv.is_promotion());
                leaf.checks = u64::from(generator.in_check(game_state));
                counts.merge(leaf);
            } else {
                let result = perft_recurse(generator, game_state, depth - 1, counts);
                if result.is_err() {
                    game_state.undo_move(mv)?;
                    return result;
                }
            }
        }
        game_state.undo_move(mv)?;
    }

    Ok(())
}
