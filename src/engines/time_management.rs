//! Clock-to-movetime allocation.
//!
//! The protocol layer passes raw clock data through `SearchLimits`; the
//! engine turns it into a single per-move budget before the search starts.

use crate::engines::search_limits::SearchLimits;
use crate::game_state::game_state::GameState;

/// Moves assumed left in the game when `movestogo` is absent, by game stage.
fn expected_moves_left(game_state: &GameState, movestogo: Option<u16>) -> u64 {
    if let Some(mtg) = movestogo {
        return u64::from(mtg.max(1));
    }
    match game_state.fullmove_number() {
        0..=10 => 40,
        11..=30 => 30,
        _ => 20,
    }
}

/// Per-move time budget in milliseconds, or `None` when the search is not
/// time-bounded. An explicit `movetime` always wins; infinite searches
/// ignore the clock.
pub fn resolve_movetime(game_state: &GameState, limits: &SearchLimits) -> Option<u64> {
    if limits.infinite {
        return None;
    }
    if limits.movetime_ms.is_some() {
        return limits.movetime_ms;
    }

    let (remaining, increment) = limits.clock_for(game_state.side_to_move())?;
    Some(clock_budget_ms(
        remaining,
        increment,
        expected_moves_left(game_state, limits.movestogo),
    ))
}

fn clock_budget_ms(remaining_ms: u64, inc_ms: u64, moves_left: u64) -> u64 {
    let reserve = (remaining_ms / 25).clamp(50, remaining_ms.saturating_sub(1).max(50));
    let usable = remaining_ms.saturating_sub(reserve);
    let base = usable / moves_left.max(1);
    let inc_bonus = inc_ms.saturating_mul(3) / 4;
    let target = base.saturating_add(inc_bonus);

    let max_budget = (remaining_ms / 4).max(1);
    target.clamp(1, max_budget)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::resolve_movetime;
    use crate::engines::search_limits::SearchLimits;
    use crate::game_state::game_state::GameState;
    use crate::search::zobrist::ZobristKeys;

    fn start() -> GameState {
        GameState::new_game(Arc::new(ZobristKeys::new()))
    }

    #[test]
    fn explicit_movetime_wins_and_infinite_has_no_budget() {
        let game = start();
        let limits = SearchLimits {
            movetime_ms: Some(250),
            wtime_ms: Some(1_000),
            ..SearchLimits::default()
        };
        assert_eq!(resolve_movetime(&game, &limits), Some(250));
        assert_eq!(resolve_movetime(&game, &SearchLimits::infinite()), None);
        assert_eq!(resolve_movetime(&game, &SearchLimits::depth(4)), None);
    }

    #[test]
    fn clock_budget_uses_movestogo_and_increment() {
        let game = start();
        let limits = SearchLimits {
            wtime_ms: Some(60_000),
            winc_ms: Some(1_000),
            movestogo: Some(20),
            ..SearchLimits::default()
        };
        // (60000 - 2400) / 20 + 750
        assert_eq!(resolve_movetime(&game, &limits), Some(3_630));
    }

    #[test]
    fn budget_never_exceeds_a_quarter_of_the_clock() {
        let game = start();
        let limits = SearchLimits {
            wtime_ms: Some(400),
            winc_ms: Some(10_000),
            ..SearchLimits::default()
        };
        assert_eq!(resolve_movetime(&game, &limits), Some(100));
    }

    #[test]
    fn dark_reads_its_own_clock() {
        let game = GameState::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            Arc::new(ZobristKeys::new()),
        )
        .expect("FEN should parse");
        let limits = SearchLimits {
            wtime_ms: Some(100_000),
            btime_ms: Some(4_000),
            ..SearchLimits::default()
        };
        let budget = resolve_movetime(&game, &limits).expect("clock should yield a budget");
        assert!(budget <= 1_000);
        assert!(budget < 100_000 / 40);
    }
}
