use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use damson_chess::errors::EngineResult;
use damson_chess::game_state::chess_rules::STARTING_POSITION_FEN;
use damson_chess::game_state::game_state::GameState;
use damson_chess::logging::{init_logging, parse_level};
use damson_chess::move_generation::move_generator::MoveGenerator;
use damson_chess::move_generation::perft::{divide, perft};
use damson_chess::moves::attack_tables::AttackTables;
use damson_chess::search::transposition_table::DEFAULT_HASH_MB;
use damson_chess::search::zobrist::ZobristKeys;
use damson_chess::uci::uci_top::run_stdio_loop;

#[derive(Parser, Debug)]
#[command(name = "damson", version, about = "Bitboard chess engine speaking UCI")]
struct Args {
    /// Transposition table size in MB (1..=128)
    #[arg(long, default_value_t = DEFAULT_HASH_MB)]
    hash: usize,

    /// Write diagnostics to this file; stdout carries the protocol only
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info", value_parser = level_arg)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count move paths from a position
    Perft {
        #[arg(long, default_value_t = 5)]
        depth: u8,

        #[arg(long, default_value = STARTING_POSITION_FEN)]
        fen: String,

        /// Print the count under each root move
        #[arg(long)]
        divide: bool,
    },
}

fn level_arg(value: &str) -> Result<LevelFilter, String> {
    parse_level(value).ok_or_else(|| format!("unknown log level '{value}'"))
}

fn run_perft(fen: &str, depth: u8, show_divide: bool) -> EngineResult<()> {
    let generator = MoveGenerator::new(Arc::new(AttackTables::new()));
    let mut game = GameState::from_fen(fen, Arc::new(ZobristKeys::new()))?;
    let started = Instant::now();

    if show_divide {
        let split = divide(&generator, &mut game, depth)?;
        for (mv, nodes) in &split {
            println!("{mv}: {nodes}");
        }
        println!();
        println!("Nodes searched: {}", split.iter().map(|(_, n)| n).sum::<u64>());
    } else {
        let counts = perft(&generator, &mut game, depth)?;
        println!(
            "depth={depth} nodes={} captures={} ep={} castles={} promotions={} checks={}",
            counts.nodes,
            counts.captures,
            counts.en_passant,
            counts.castles,
            counts.promotions,
            counts.checks
        );
    }
    println!("elapsed_ms={}", started.elapsed().as_millis());
    Ok(())
}

fn main() -> EngineResult<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path, args.log_level)?;
    }

    match args.command {
        Some(Command::Perft { depth, fen, divide }) => run_perft(&fen, depth, divide),
        None => run_stdio_loop(args.hash),
    }
}
