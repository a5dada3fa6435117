//! Iterative deepening search with principal-variation alpha-beta.
//!
//! `SearchContext` owns everything a search mutates: the live position, the
//! transposition table, killer slots, and the hash history used for
//! repetition detection. The engine keeps it behind a mutex so exactly one
//! thread walks the tree at a time.
//!
//! Per iteration the root is searched inside an aspiration window around the
//! previous score. A fail low or high widens the failing side by
//! `window << n` and re-searches the same depth. Iterations cut short by
//! cancellation are discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use crate::errors::EngineResult;
use crate::game_state::chess_types::*;
use crate::game_state::game_state::GameState;
use crate::move_generation::move_generator::MoveGenerator;
use crate::moves::chess_move::Move;
use crate::search::board_scoring::{game_phase, BoardScorer};
use crate::search::transposition_table::{
    score_from_tt, score_to_tt, Bound, TTEntry, TranspositionTable, MATE_SCORE,
};
use crate::utils::long_algebraic::long_algebraic_to_move;

pub const INFINITY: i32 = 32_000;
pub const DRAW_SCORE: i32 = 0;
pub const MAX_SEARCH_DEPTH: u8 = 64;

const FIFTY_MOVE_PLIES: u32 = 100;
const MIN_REPETITION_PLIES: usize = 8;
const TIME_CHECK_INTERVAL: u64 = 1024;

/// Tuned heuristic constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Half-width of the root aspiration window in centipawns.
    pub aspiration_window: i32,
    /// Quiescence stand-pat delta margin.
    pub delta_margin: i32,
    /// Delta margin while the side to move has a pawn on its seventh rank.
    pub promotion_delta_margin: i32,
    /// Per-capture futility margin added to the captured piece's value.
    pub capture_margin: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            aspiration_window: 50,
            delta_margin: 1000,
            promotion_delta_margin: 1800,
            capture_margin: 200,
        }
    }
}

/// Cooperative exit conditions for one search, polled at node boundaries.
#[derive(Debug)]
pub struct SearchControl {
    stop: Arc<AtomicBool>,
    started_at: Instant,
    movetime: Option<Duration>,
    max_nodes: Option<u64>,
    infinite: bool,
    nodes: u64,
    aborted: bool,
}

impl SearchControl {
    pub fn new(stop: Arc<AtomicBool>, movetime_ms: Option<u64>, max_nodes: Option<u64>, infinite: bool) -> Self {
        Self {
            stop,
            started_at: Instant::now(),
            movetime: movetime_ms.map(Duration::from_millis),
            max_nodes: max_nodes.filter(|n| *n > 0),
            infinite,
            nodes: 0,
            aborted: false,
        }
    }

    /// Only the stop flag can end this search.
    pub fn unbounded(stop: Arc<AtomicBool>) -> Self {
        Self::new(stop, None, None, false)
    }

    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    #[inline]
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Latches to true once any limit trips. The clock is read only every
    /// `TIME_CHECK_INTERVAL` nodes.
    pub fn should_exit(&mut self) -> bool {
        if self.aborted {
            return true;
        }
        if self.stop.load(Ordering::Relaxed) {
            self.aborted = true;
        } else if !self.infinite {
            if self.max_nodes.is_some_and(|cap| self.nodes > cap) {
                self.aborted = true;
            } else if let Some(limit) = self.movetime {
                if self.nodes % TIME_CHECK_INTERVAL == 0 && self.started_at.elapsed() > limit {
                    self.aborted = true;
                }
            }
        }
        self.aborted
    }
}

/// One completed root search, emitted for progress output.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub depth: u8,
    pub score: i32,
    /// `Exact` inside the window; `Upper`/`Lower` on a fail low/high.
    pub bound: Bound,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// `Move::NULL` only when the root has no legal move.
    pub best_move: Move,
    pub score: i32,
    /// Deepest fully completed iteration; 0 when none completed.
    pub depth: u8,
    pub nodes: u64,
    pub pv: Vec<Move>,
}

pub struct SearchContext {
    pub game_state: GameState,
    pub generator: MoveGenerator,
    pub tt: TranspositionTable,
    pub config: SearchConfig,
    scorer: Box<dyn BoardScorer>,
    killers: Vec<[Move; 2]>,
    game_history: Vec<u64>,
}

impl SearchContext {
    pub fn new(
        game_state: GameState,
        generator: MoveGenerator,
        tt: TranspositionTable,
        scorer: Box<dyn BoardScorer>,
    ) -> Self {
        let game_history = vec![game_state.hash()];
        Self {
            game_state,
            generator,
            tt,
            config: SearchConfig::default(),
            scorer,
            killers: vec![[Move::NULL; 2]; MAX_SEARCH_DEPTH as usize + 1],
            game_history,
        }
    }

    /// Replace the position and restart the repetition history from it.
    pub fn set_position(&mut self, game_state: GameState) {
        self.game_history.clear();
        self.game_history.push(game_state.hash());
        self.game_state = game_state;
    }

    /// Resolve and play a coordinate move. Illegal or unknown text leaves
    /// the position untouched.
    pub fn apply_move(&mut self, text: &str) -> EngineResult<Move> {
        let mv = long_algebraic_to_move(text, &mut self.game_state, &self.generator)?;
        self.game_state.make_move(mv)?;
        self.game_history.push(self.game_state.hash());
        Ok(mv)
    }

    /// Forget everything learned from previous games.
    pub fn clear_heuristics(&mut self) {
        self.tt.clear();
        self.killers.fill([Move::NULL; 2]);
    }

    /// Put back a root position saved before a search that failed midway.
    pub fn restore_root(&mut self, root: GameState, history_len: usize) {
        self.game_state = root;
        self.game_history.truncate(history_len.max(1));
    }

    #[inline]
    pub fn game_history(&self) -> &[u64] {
        &self.game_history
    }

    /// Threefold repetition of the current position within the reversible window.
    pub fn is_threefold_repetition(&self) -> bool {
        let len = self.game_history.len();
        let max_plies = (len - 1).min(self.game_state.halfmove_clock() as usize);
        if max_plies < MIN_REPETITION_PLIES {
            return false;
        }

        let current = self.game_history[len - 1];
        let mut repetitions = 1;
        for ply in (2..=max_plies).step_by(2) {
            if self.game_history[len - 1 - ply] == current {
                repetitions += 1;
                if repetitions == 3 {
                    return true;
                }
            }
        }
        false
    }

    /// Run iterative deepening up to `max_depth`, reporting every finished
    /// root search through `on_report`.
    pub fn search(
        &mut self,
        max_depth: u8,
        control: &mut SearchControl,
        on_report: &mut dyn FnMut(&SearchReport),
    ) -> EngineResult<SearchOutcome> {
        let max_depth = max_depth.clamp(1, MAX_SEARCH_DEPTH);
        let root_moves = self.generator.legal_moves(&mut self.game_state)?;
        let mut outcome = SearchOutcome {
            best_move: root_moves.first().copied().unwrap_or(Move::NULL),
            score: 0,
            depth: 0,
            nodes: 0,
            pv: Vec::new(),
        };
        if root_moves.is_empty() {
            return Ok(outcome);
        }

        let window = self.config.aspiration_window;
        let mut alpha = -INFINITY;
        let mut beta = INFINITY;

        'deepening: for depth in 1..=max_depth {
            if control.should_exit() {
                break;
            }

            let mut low_fails = 0u32;
            let mut high_fails = 0u32;
            let score = loop {
                let mut pv = Vec::new();
                let score = self.alpha_beta(depth, alpha, beta, 0, &mut pv, control)?;
                if control.aborted() {
                    break 'deepening;
                }

                let bound = if score <= alpha {
                    Bound::Upper
                } else if score >= beta {
                    Bound::Lower
                } else {
                    Bound::Exact
                };
                on_report(&self.report(depth, score, bound, control, pv.clone()));

                match bound {
                    Bound::Upper => {
                        low_fails += 1;
                        alpha = alpha.saturating_sub(widen(window, low_fails)).max(-INFINITY);
                    }
                    Bound::Lower => {
                        high_fails += 1;
                        beta = beta.saturating_add(widen(window, high_fails)).min(INFINITY);
                    }
                    Bound::Exact => {
                        if let Some(&first) = pv.first() {
                            outcome.best_move = first;
                        }
                        outcome.pv = pv;
                        break score;
                    }
                }
            };

            outcome.score = score;
            outcome.depth = depth;
            debug!(
                "depth {depth} score {score} nodes {} best {}",
                control.nodes(),
                outcome.best_move
            );

            alpha = (score - window).max(-INFINITY);
            beta = (score + window).min(INFINITY);
        }

        outcome.nodes = control.nodes();
        Ok(outcome)
    }

    fn report(&self, depth: u8, score: i32, bound: Bound, control: &SearchControl, pv: Vec<Move>) -> SearchReport {
        let elapsed_ms = control.elapsed_ms();
        let nodes = control.nodes();
        SearchReport {
            depth,
            score,
            bound,
            nodes,
            elapsed_ms,
            nps: if elapsed_ms == 0 { 0 } else { nodes.saturating_mul(1000) / elapsed_ms },
            hashfull: self.tt.hashfull(),
            pv,
        }
    }

    fn alpha_beta(
        &mut self,
        depth: u8,
        mut alpha: i32,
        beta: i32,
        ply: i32,
        pv: &mut Vec<Move>,
        control: &mut SearchControl,
    ) -> EngineResult<i32> {
        pv.clear();
        if control.should_exit() {
            return Ok(DRAW_SCORE);
        }
        if ply > 0
            && (self.game_state.halfmove_clock() >= FIFTY_MOVE_PLIES || self.is_threefold_repetition())
        {
            return Ok(DRAW_SCORE);
        }
        if depth == 0 {
            return self.quiescence(alpha, beta, ply, control);
        }

        control.nodes += 1;

        let key = self.game_state.hash();
        let tt_hit = self.tt.probe(key);
        if let Some(entry) = tt_hit {
            let score = score_from_tt(entry.score, ply);
            let usable = ply > 0
                && entry.depth >= depth
                && match entry.bound {
                    Bound::Exact => true,
                    Bound::Upper => score <= alpha,
                    Bound::Lower => score >= beta,
                };
            if usable {
                if self.generator.validate(&self.game_state, entry.best_move) {
                    pv.push(entry.best_move);
                }
                return Ok(score);
            }
        }

        let mut moves = Vec::with_capacity(64);
        self.generator.generate_all(&self.game_state, &mut moves);
        self.order_moves(&mut moves, depth, tt_hit.map(|e| e.best_move));

        let mut best_score = -MATE_SCORE + ply;
        let mut best_move = Move::NULL;
        let mut alpha_raised = false;
        let mut any_legal = false;
        let mut line = Vec::with_capacity(depth as usize);

        for mv in moves {
            self.game_state.make_move(mv)?;
            self.game_history.push(self.game_state.hash());

            if self.generator.mover_king_safe(&self.game_state) {
                any_legal = true;
                let score = if alpha_raised {
                    let scout = -self.alpha_beta(depth - 1, -alpha - 1, -alpha, ply + 1, &mut line, control)?;
                    if scout > alpha && scout < beta {
                        -self.alpha_beta(depth - 1, -beta, -alpha, ply + 1, &mut line, control)?
                    } else {
                        scout
                    }
                } else {
                    -self.alpha_beta(depth - 1, -beta, -alpha, ply + 1, &mut line, control)?
                };

                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    if score > alpha {
                        alpha_raised = true;
                        alpha = score;
                        pv.clear();
                        pv.push(mv);
                        pv.extend_from_slice(&line);
                    }
                }
            }

            self.game_history.pop();
            self.game_state.undo_move(mv)?;

            if alpha >= beta {
                self.store(tt_hit, key, depth, best_score, ply, Bound::Lower, best_move, control);
                if !mv.is_capture() {
                    self.record_killer(depth, mv);
                }
                return Ok(best_score);
            }
        }

        if !any_legal {
            best_score = if self.generator.in_check(&self.game_state) {
                -MATE_SCORE + ply
            } else {
                DRAW_SCORE
            };
        }

        let bound = if alpha_raised { Bound::Exact } else { Bound::Upper };
        self.store(tt_hit, key, depth, best_score, ply, bound, best_move, control);
        Ok(best_score)
    }

    fn quiescence(&mut self, mut alpha: i32, beta: i32, ply: i32, control: &mut SearchControl) -> EngineResult<i32> {
        if control.should_exit() {
            return Ok(DRAW_SCORE);
        }
        control.nodes += 1;

        let stand_pat = self.scorer.score(&self.game_state, game_phase(&self.game_state));
        let in_check = self.generator.in_check(&self.game_state);
        let mut moves = Vec::with_capacity(32);
        let mut best_score;

        if in_check {
            best_score = -MATE_SCORE + ply;
            self.generator.evade_checks(&self.game_state, &mut moves);
        } else {
            best_score = stand_pat;
            if best_score > alpha {
                alpha = best_score;
                if alpha >= beta {
                    return Ok(best_score);
                }
            } else if best_score + self.delta_margin() < alpha {
                return Ok(best_score);
            }

            self.generator.generate_captures(&self.game_state, &mut moves);
            let state = &self.game_state;
            moves.sort_by_key(|mv| {
                if mv.is_en_passant() {
                    i32::MAX
                } else {
                    -victim_value(state, *mv)
                }
            });
        }

        for mv in moves {
            self.game_state.make_move(mv)?;

            let gain = self
                .game_state
                .last_captured()
                .map_or(0, PieceKind::material_value);
            let worth_searching = in_check || stand_pat + gain + self.config.capture_margin > alpha;
            if worth_searching && self.generator.mover_king_safe(&self.game_state) {
                let score = -self.quiescence(-beta, -alpha, ply + 1, control)?;
                if score > best_score {
                    best_score = score;
                    if score > alpha {
                        alpha = score;
                    }
                }
            }

            self.game_state.undo_move(mv)?;
            if alpha >= beta {
                return Ok(best_score);
            }
        }

        Ok(best_score)
    }

    fn delta_margin(&self) -> i32 {
        let us = self.game_state.side_to_move();
        let seventh = match us {
            Color::Light => RANK_7,
            Color::Dark => RANK_2,
        };
        if self.game_state.pieces_of(us, PieceKind::Pawn) & seventh != 0 {
            self.config.promotion_delta_margin
        } else {
            self.config.delta_margin
        }
    }

    /// Captures by victim value, then killers, then the rest in generation
    /// order; the table move goes first when present.
    fn order_moves(&self, moves: &mut [Move], depth: u8, tt_move: Option<Move>) {
        let killers = self.killers[depth as usize];
        let state = &self.game_state;
        moves.sort_by_key(|&mv| {
            if mv.is_capture() {
                (0, -victim_value(state, mv))
            } else if mv == killers[0] || mv == killers[1] {
                (1, 0)
            } else {
                (2, 0)
            }
        });

        if let Some(tt_move) = tt_move.filter(|mv| !mv.is_null()) {
            if let Some(idx) = moves.iter().position(|&mv| mv == tt_move) {
                moves[..=idx].rotate_right(1);
            }
        }
    }

    fn record_killer(&mut self, depth: u8, mv: Move) {
        let slot = &mut self.killers[depth as usize];
        if slot[0] != mv {
            slot[1] = slot[0];
            slot[0] = mv;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn store(
        &mut self,
        tt_hit: Option<TTEntry>,
        key: u64,
        depth: u8,
        score: i32,
        ply: i32,
        bound: Bound,
        best_move: Move,
        control: &SearchControl,
    ) {
        if control.aborted() || tt_hit.is_some_and(|e| depth < e.depth) {
            return;
        }
        self.tt.store(TTEntry {
            key,
            depth,
            score: score_to_tt(score, ply),
            bound,
            best_move,
        });
    }
}

#[inline]
fn widen(window: i32, fails: u32) -> i32 {
    window.saturating_mul(1 << fails.min(16))
}

#[inline]
fn victim_value(state: &GameState, mv: Move) -> i32 {
    state.piece_kind_on(mv.to()).map_or(0, PieceKind::material_value)
}
