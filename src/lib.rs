//! Crate root module declarations for the Damson chess engine.
//!
//! This file exposes the top-level subsystems (game state, move generation,
//! search, the threaded search engine, UCI protocol handling, and utility
//! helpers) so the binary, benches, and external tooling can import stable
//! module paths.

pub mod errors;
pub mod logging;

pub mod game_state {
    pub mod chess_rules;
    pub mod chess_types;
    pub mod game_state;
    pub mod state_word;
}

pub mod moves {
    pub mod attack_tables;
    pub mod chess_move;
    pub mod magic_numbers;
}

pub mod move_generation {
    pub mod move_generator;
    pub mod perft;
}

pub mod search {
    pub mod board_scoring;
    pub mod iterative_deepening;
    pub mod transposition_table;
    pub mod zobrist;
}

pub mod engines {
    pub mod search_engine;
    pub mod search_limits;
    pub mod time_management;
}

pub mod uci {
    pub mod uci_top;
}

pub mod utils {
    pub mod algebraic;
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod long_algebraic;
    pub mod render_game_state;
}
