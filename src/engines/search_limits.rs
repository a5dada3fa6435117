//! Budgets for a single search, as read from a `go` command.

use crate::game_state::chess_types::Color;
use crate::search::iterative_deepening::MAX_SEARCH_DEPTH;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub movetime_ms: Option<u64>,
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: Option<u64>,
    pub binc_ms: Option<u64>,
    pub movestogo: Option<u16>,
    pub infinite: bool,
    /// Run a perft count to this depth instead of searching.
    pub perft: Option<u8>,
}

impl SearchLimits {
    pub fn depth(depth: u8) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            infinite: true,
            ..Self::default()
        }
    }

    /// Deepest iteration to attempt. Infinite searches ignore any depth cap.
    pub fn max_depth(&self) -> u8 {
        if self.infinite {
            MAX_SEARCH_DEPTH
        } else {
            self.depth
                .filter(|d| *d > 0)
                .map_or(MAX_SEARCH_DEPTH, |d| d.min(MAX_SEARCH_DEPTH))
        }
    }

    /// Remaining clock and increment for `color`, when a clock was given.
    pub fn clock_for(&self, color: Color) -> Option<(u64, u64)> {
        let (remaining, increment) = match color {
            Color::Light => (self.wtime_ms, self.winc_ms),
            Color::Dark => (self.btime_ms, self.binc_ms),
        };
        remaining.map(|r| (r, increment.unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::SearchLimits;
    use crate::game_state::chess_types::Color;
    use crate::search::iterative_deepening::MAX_SEARCH_DEPTH;

    #[test]
    fn max_depth_defaults_and_caps() {
        assert_eq!(SearchLimits::default().max_depth(), MAX_SEARCH_DEPTH);
        assert_eq!(SearchLimits::depth(0).max_depth(), MAX_SEARCH_DEPTH);
        assert_eq!(SearchLimits::depth(6).max_depth(), 6);
        assert_eq!(SearchLimits::depth(200).max_depth(), MAX_SEARCH_DEPTH);

        let mut limits = SearchLimits::infinite();
        limits.depth = Some(3);
        assert_eq!(limits.max_depth(), MAX_SEARCH_DEPTH);
    }

    #[test]
    fn clock_is_read_for_the_mover() {
        let limits = SearchLimits {
            wtime_ms: Some(60_000),
            btime_ms: Some(30_000),
            binc_ms: Some(500),
            ..SearchLimits::default()
        };
        assert_eq!(limits.clock_for(Color::Light), Some((60_000, 0)));
        assert_eq!(limits.clock_for(Color::Dark), Some((30_000, 500)));
        assert_eq!(SearchLimits::movetime(10).clock_for(Color::Light), None);
    }
}
