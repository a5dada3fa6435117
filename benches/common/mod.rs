//! Positions and suite selection shared by the benches.

use std::env;

pub const KIWIPETE_FEN: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
pub const ROOK_ENDGAME_FEN: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
pub const MIDDLEGAME_FEN: &str =
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

/// `DAMSON_BENCH_SUITE=standard` selects the long runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Quick,
    Standard,
}

impl Suite {
    pub fn from_env() -> Self {
        match env::var("DAMSON_BENCH_SUITE") {
            Ok(value) if value.eq_ignore_ascii_case("standard") => Suite::Standard,
            _ => Suite::Quick,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Suite::Quick => "quick",
            Suite::Standard => "standard",
        }
    }
}
