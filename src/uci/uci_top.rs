//! UCI protocol front-end and command loop.
//!
//! Parses UCI commands and forwards them to the `SearchEngine`. Synchronous
//! replies (`uciok`, `readyok`, errors) are written by the command loop;
//! search progress and `bestmove` lines come from the engine's event channel
//! and are printed by a dedicated output thread.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use log::{debug, warn};

use crate::engines::search_engine::{SearchEngine, SearchEvent};
use crate::engines::search_limits::SearchLimits;
use crate::errors::{EngineError, EngineResult};
use crate::search::iterative_deepening::SearchReport;
use crate::search::transposition_table::{
    Bound, DEFAULT_HASH_MB, MATE_SCORE, MATE_THRESHOLD, MAX_HASH_MB, MIN_HASH_MB,
};

const UCI_ENGINE_NAME: &str = "Damson";
const UCI_ENGINE_AUTHOR: &str = "the Damson developers";

pub fn run_stdio_loop(hash_mb: usize) -> EngineResult<()> {
    let (events_tx, events_rx) = channel();
    let printer = thread::Builder::new()
        .name("uci-output".to_owned())
        .spawn(move || print_events(events_rx))?;

    let mut uci = UciState::new(hash_mb, events_tx)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let should_quit = uci.handle_command(&line, &mut stdout.lock())?;
        stdout.flush()?;
        if should_quit {
            break;
        }
    }

    uci.engine.stop_search()?;
    // Dropping the engine closes the event channel and ends the printer.
    drop(uci);
    printer.join().map_err(|_| EngineError::WorkerPanicked)
}

fn print_events(events: Receiver<SearchEvent>) {
    for event in events {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", format_event(&event));
        let _ = out.flush();
    }
}

pub fn format_event(event: &SearchEvent) -> String {
    match event {
        SearchEvent::Info(report) => format_report(report),
        SearchEvent::BestMove(mv) => format!("bestmove {mv}"),
        SearchEvent::Error(message) => format!("info string search error: {message}"),
    }
}

pub fn format_report(report: &SearchReport) -> String {
    let bound = match report.bound {
        Bound::Exact => "",
        Bound::Lower => " lowerbound",
        Bound::Upper => " upperbound",
    };
    let mut line = format!(
        "info depth {} score {}{} nodes {} time {} nps {} hashfull {}",
        report.depth,
        format_score(report.score),
        bound,
        report.nodes,
        report.elapsed_ms,
        report.nps,
        report.hashfull
    );
    if !report.pv.is_empty() {
        line.push_str(" pv");
        for mv in &report.pv {
            line.push(' ');
            line.push_str(&mv.to_long_algebraic());
        }
    }
    line
}

/// `mate N` in full moves (negative when being mated) or `cp N`.
pub fn format_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let plies = MATE_SCORE - score.abs();
        let moves = (plies + 1) / 2;
        if score > 0 {
            format!("mate {moves}")
        } else {
            format!("mate -{moves}")
        }
    } else {
        format!("cp {score}")
    }
}

struct UciState {
    engine: SearchEngine,
    debug_mode: bool,
}

impl UciState {
    fn new(hash_mb: usize, events: Sender<SearchEvent>) -> EngineResult<Self> {
        Ok(Self {
            engine: SearchEngine::new(hash_mb, events)?,
            debug_mode: false,
        })
    }

    fn handle_command(&mut self, line: &str, out: &mut impl Write) -> EngineResult<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }
        debug!("<< {trimmed}");

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or_default();

        match cmd {
            "uci" => {
                writeln!(out, "id name {}", UCI_ENGINE_NAME)?;
                writeln!(out, "id author {}", UCI_ENGINE_AUTHOR)?;
                writeln!(
                    out,
                    "option name Hash type spin default {} min {} max {}",
                    DEFAULT_HASH_MB, MIN_HASH_MB, MAX_HASH_MB
                )?;
                writeln!(out, "uciok")?;
            }
            "isready" => {
                writeln!(out, "readyok")?;
            }
            "setoption" => {
                if let Err(err) = self.handle_setoption(trimmed) {
                    warn!("setoption rejected: {err}");
                    writeln!(out, "info string setoption error: {}", err)?;
                }
            }
            "ucinewgame" => {
                if let Err(err) = self.engine.new_game() {
                    writeln!(out, "info string ucinewgame error: {}", err)?;
                }
            }
            "position" => {
                if let Err(err) = self.handle_position(trimmed) {
                    warn!("position rejected: {err}");
                    writeln!(out, "info string position error: {}", err)?;
                }
            }
            "go" => {
                if let Err(err) = self.handle_go(trimmed, out) {
                    warn!("go rejected: {err}");
                    writeln!(out, "info string go error: {}", err)?;
                    writeln!(out, "bestmove 0000")?;
                }
            }
            "stop" => {
                if let Err(err) = self.engine.stop_search() {
                    warn!("stop failed: {err}");
                    writeln!(out, "info string stop error: {}", err)?;
                }
            }
            "d" => match self.engine.render() {
                Ok(board) => writeln!(out, "{}", board)?,
                Err(err) => writeln!(out, "info string d error: {}", err)?,
            },
            "debug" => {
                let mode = parts.next().unwrap_or_default();
                self.debug_mode = mode.eq_ignore_ascii_case("on");
            }
            "quit" => {
                return Ok(true);
            }
            _ => {
                // Unknown commands are ignored for UCI compatibility.
                debug!("ignoring unknown command {cmd}");
            }
        }

        Ok(false)
    }

    fn handle_setoption(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace();
        let _ = tokens.next(); // setoption

        let mut name_tokens = Vec::<&str>::new();
        let mut value_tokens = Vec::<&str>::new();
        let mut mode = "";

        for tok in tokens {
            match tok {
                "name" => mode = "name",
                "value" => mode = "value",
                _ if mode == "name" => name_tokens.push(tok),
                _ if mode == "value" => value_tokens.push(tok),
                _ => {}
            }
        }

        let name = name_tokens.join(" ");
        let value = value_tokens.join(" ");

        if name.eq_ignore_ascii_case("Hash") {
            let parsed = value
                .parse::<usize>()
                .map_err(|_| format!("invalid Hash value '{}'", value))?;
            self.engine.resize_table(parsed).map_err(|e| e.to_string())
        } else {
            Err(format!("unknown option '{}'", name))
        }
    }

    fn handle_position(&mut self, line: &str) -> EngineResult<()> {
        let mut tokens = line.split_whitespace().peekable();
        let _ = tokens.next(); // "position"

        match tokens.next() {
            Some("startpos") => self.engine.set_start_position()?,
            Some("fen") => {
                let mut fen_parts = Vec::<&str>::new();
                while let Some(next) = tokens.next_if(|tok| *tok != "moves") {
                    fen_parts.push(next);
                }
                if fen_parts.is_empty() {
                    return Err(EngineError::InvalidFen("missing FEN after 'position fen'".to_owned()));
                }
                self.engine.set_position(&fen_parts.join(" "))?;
            }
            Some(other) => {
                return Err(EngineError::InvalidFen(format!("unsupported position token '{}'", other)))
            }
            None => return Err(EngineError::InvalidFen("incomplete position command".to_owned())),
        }

        if tokens.next_if_eq(&"moves").is_some() {
            for lan in tokens {
                self.engine.apply_move(lan)?;
            }
        }
        Ok(())
    }

    fn handle_go(&mut self, line: &str, out: &mut impl Write) -> EngineResult<()> {
        let limits = parse_go_params(line);
        if let Some(depth) = limits.perft {
            let split = self.engine.perft(depth)?;
            for (mv, nodes) in &split {
                writeln!(out, "{mv}: {nodes}")?;
            }
            writeln!(out)?;
            writeln!(out, "Nodes searched: {}", split.iter().map(|(_, n)| n).sum::<u64>())?;
            return Ok(());
        }
        if self.debug_mode {
            writeln!(out, "info string limits {:?}", limits)?;
        }
        self.engine.start_search(limits)
    }
}

fn parse_go_params(line: &str) -> SearchLimits {
    let mut limits = SearchLimits::default();
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    let mut i = 0usize;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                limits.depth = tokens.get(i).and_then(|x| x.parse::<u8>().ok());
            }
            "nodes" => {
                i += 1;
                limits.nodes = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "movetime" => {
                i += 1;
                limits.movetime_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "infinite" => {
                limits.infinite = true;
            }
            "wtime" => {
                i += 1;
                limits.wtime_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "btime" => {
                i += 1;
                limits.btime_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "winc" => {
                i += 1;
                limits.winc_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "binc" => {
                i += 1;
                limits.binc_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "movestogo" => {
                i += 1;
                limits.movestogo = tokens.get(i).and_then(|x| x.parse::<u16>().ok());
            }
            "perft" => {
                i += 1;
                limits.perft = tokens.get(i).and_then(|x| x.parse::<u8>().ok());
            }
            _ => {}
        }
        i += 1;
    }
    limits
}
