//! Search engine front door: one mutex-guarded `SearchContext` and at most one
//! worker thread searching it.
//!
//! Every mutating entry point first cancels any running search, then takes
//! the lock. `start_search` hands the lock to the worker for the whole search
//! and returns immediately; progress and the final move arrive on the event
//! channel given at construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use crate::engines::search_limits::SearchLimits;
use crate::engines::time_management::resolve_movetime;
use crate::errors::{EngineError, EngineResult};
use crate::game_state::game_state::GameState;
use crate::move_generation::move_generator::MoveGenerator;
use crate::move_generation::perft::divide;
use crate::moves::attack_tables::AttackTables;
use crate::moves::chess_move::Move;
use crate::search::board_scoring::{BoardScorer, TaperedPstScorer};
use crate::search::iterative_deepening::{
    SearchConfig, SearchContext, SearchControl, SearchOutcome, SearchReport,
};
use crate::search::transposition_table::TranspositionTable;
use crate::search::zobrist::ZobristKeys;
use crate::utils::render_game_state::render_game_state;

/// Messages from the worker to whoever prints results.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Info(SearchReport),
    /// Always sent exactly once per search, also after cancellation or failure.
    BestMove(Move),
    Error(String),
}

pub struct SearchEngine {
    context: Arc<Mutex<SearchContext>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    events: Sender<SearchEvent>,
}

impl SearchEngine {
    pub fn new(hash_mb: usize, events: Sender<SearchEvent>) -> EngineResult<Self> {
        Self::with_scorer(hash_mb, Box::new(TaperedPstScorer), events)
    }

    pub fn with_scorer(
        hash_mb: usize,
        scorer: Box<dyn BoardScorer>,
        events: Sender<SearchEvent>,
    ) -> EngineResult<Self> {
        let keys = Arc::new(ZobristKeys::new());
        let generator = MoveGenerator::new(Arc::new(AttackTables::new()));
        let tt = TranspositionTable::new_with_mb(hash_mb)?;
        let context = SearchContext::new(GameState::new_game(keys), generator, tt, scorer);
        info!("engine ready with {hash_mb} MB hash");
        Ok(Self {
            context: Arc::new(Mutex::new(context)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            events,
        })
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, SearchContext>> {
        self.context.lock().map_err(|_| EngineError::LockPoisoned)
    }

    /// Replace the live position. A malformed FEN leaves the old one in place.
    pub fn set_position(&mut self, fen: &str) -> EngineResult<()> {
        self.stop_search()?;
        let mut ctx = self.lock()?;
        let game_state = GameState::from_fen(fen, Arc::clone(ctx.game_state.keys()))?;
        ctx.set_position(game_state);
        info!("position set: {fen}");
        Ok(())
    }

    pub fn set_start_position(&mut self) -> EngineResult<()> {
        self.stop_search()?;
        let mut ctx = self.lock()?;
        let game_state = GameState::new_game(Arc::clone(ctx.game_state.keys()));
        ctx.set_position(game_state);
        info!("position set: startpos");
        Ok(())
    }

    pub fn apply_move(&mut self, text: &str) -> EngineResult<Move> {
        self.stop_search()?;
        let mut ctx = self.lock()?;
        ctx.apply_move(text).inspect_err(|err| warn!("rejected move {text}: {err}"))
    }

    pub fn resize_table(&mut self, size_mb: usize) -> EngineResult<()> {
        self.stop_search()?;
        let mut ctx = self.lock()?;
        ctx.tt.resize(size_mb)?;
        info!("transposition table resized to {size_mb} MB");
        Ok(())
    }

    /// Start position, empty table, no killers.
    pub fn new_game(&mut self) -> EngineResult<()> {
        self.stop_search()?;
        let mut ctx = self.lock()?;
        let game_state = GameState::new_game(Arc::clone(ctx.game_state.keys()));
        ctx.set_position(game_state);
        ctx.clear_heuristics();
        info!("new game");
        Ok(())
    }

    pub fn set_config(&mut self, config: SearchConfig) -> EngineResult<()> {
        self.stop_search()?;
        self.lock()?.config = config;
        Ok(())
    }

    pub fn config(&mut self) -> EngineResult<SearchConfig> {
        self.stop_search()?;
        Ok(self.lock()?.config)
    }

    pub fn fen(&mut self) -> EngineResult<String> {
        self.stop_search()?;
        Ok(self.lock()?.game_state.get_fen())
    }

    pub fn render(&mut self) -> EngineResult<String> {
        self.stop_search()?;
        Ok(render_game_state(&self.lock()?.game_state))
    }

    /// Leaf counts under each legal root move.
    pub fn perft(&mut self, depth: u8) -> EngineResult<Vec<(Move, u64)>> {
        self.stop_search()?;
        let mut guard = self.lock()?;
        let ctx = &mut *guard;
        divide(&ctx.generator, &mut ctx.game_state, depth)
    }

    /// Cancel any running search and start a new one on a worker thread.
    pub fn start_search(&mut self, limits: SearchLimits) -> EngineResult<()> {
        self.stop_search()?;
        self.stop.store(false, Ordering::Relaxed);

        let context = Arc::clone(&self.context);
        let stop = Arc::clone(&self.stop);
        let events = self.events.clone();
        debug!("starting search: {limits:?}");
        let handle = thread::Builder::new()
            .name("search".to_owned())
            .spawn(move || run_search(&context, stop, &events, &limits))?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Raise the stop flag and block until the worker has exited.
    pub fn stop_search(&mut self) -> EngineResult<()> {
        self.stop.store(true, Ordering::Relaxed);
        self.join_worker()
    }

    /// Block until the running search finishes on its own limits.
    pub fn wait(&mut self) -> EngineResult<()> {
        self.join_worker()
    }

    #[inline]
    pub fn is_searching(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Replace the worker with one that panics while holding the lock.
    #[cfg(test)]
    pub(crate) fn simulate_worker_panic(&mut self) {
        let context = Arc::clone(&self.context);
        self.worker = Some(thread::spawn(move || {
            let _guard = context.lock();
            panic!("worker failure");
        }));
    }

    fn join_worker(&mut self) -> EngineResult<()> {
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| EngineError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        if let Err(err) = self.stop_search() {
            error!("search worker ended badly: {err}");
        }
    }
}

fn run_search(
    context: &Mutex<SearchContext>,
    stop: Arc<AtomicBool>,
    events: &Sender<SearchEvent>,
    limits: &SearchLimits,
) {
    let mut ctx = match context.lock() {
        Ok(ctx) => ctx,
        Err(_) => {
            error!("search context lock poisoned");
            let _ = events.send(SearchEvent::Error(EngineError::LockPoisoned.to_string()));
            let _ = events.send(SearchEvent::BestMove(Move::NULL));
            return;
        }
    };

    let movetime = resolve_movetime(&ctx.game_state, limits);
    let mut control = SearchControl::new(stop, movetime, limits.nodes, limits.infinite);
    let root = ctx.game_state.clone();
    let history_len = ctx.game_history().len();

    let result = ctx.search(limits.max_depth(), &mut control, &mut |report| {
        let _ = events.send(SearchEvent::Info(report.clone()));
    });

    let best_move = match result {
        Ok(SearchOutcome {
            best_move,
            score,
            depth,
            nodes,
            ..
        }) => {
            info!(
                "search done: best {best_move} score {score} depth {depth} nodes {nodes} in {} ms{}",
                control.elapsed_ms(),
                if control.aborted() { " (stopped)" } else { "" }
            );
            best_move
        }
        Err(err) => {
            error!("search failed: {err}");
            ctx.restore_root(root, history_len);
            let _ = events.send(SearchEvent::Error(err.to_string()));
            Move::NULL
        }
    };
    let _ = events.send(SearchEvent::BestMove(best_move));
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{channel, Receiver};
    use std::time::{Duration, Instant};

    use super::{SearchEngine, SearchEvent};
    use crate::engines::search_limits::SearchLimits;
    use crate::errors::EngineError;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::moves::chess_move::Move;
    use crate::search::iterative_deepening::SearchConfig;
    use crate::search::transposition_table::Bound;

    fn engine() -> (SearchEngine, Receiver<SearchEvent>) {
        let (tx, rx) = channel();
        (SearchEngine::new(1, tx).expect("engine should build"), rx)
    }

    fn best_moves(rx: &Receiver<SearchEvent>) -> Vec<Move> {
        rx.try_iter()
            .filter_map(|e| match e {
                SearchEvent::BestMove(mv) => Some(mv),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fixed_depth_search_reports_and_finishes() {
        let (mut engine, rx) = engine();
        engine.start_search(SearchLimits::depth(3)).expect("search should start");
        engine.wait().expect("worker should join");

        let events: Vec<SearchEvent> = rx.try_iter().collect();
        let infos = events.iter().filter(|e| matches!(e, SearchEvent::Info(_))).count();
        assert!(infos >= 3);
        match events.last() {
            Some(SearchEvent::BestMove(mv)) => assert!(!mv.is_null()),
            other => panic!("expected a final best move, got {other:?}"),
        }
        assert_eq!(engine.fen().expect("fen should read"), STARTING_POSITION_FEN);
    }

    #[test]
    fn stop_returns_promptly_with_a_move() {
        let (mut engine, rx) = engine();
        engine.start_search(SearchLimits::infinite()).expect("search should start");
        std::thread::sleep(Duration::from_millis(50));
        assert!(engine.is_searching());

        let asked = Instant::now();
        engine.stop_search().expect("stop should join");
        assert!(asked.elapsed() < Duration::from_secs(2));
        assert!(!engine.is_searching());

        let moves = best_moves(&rx);
        assert_eq!(moves.len(), 1);
        assert!(!moves[0].is_null());
    }

    #[test]
    fn movetime_bounds_the_search() {
        let (mut engine, rx) = engine();
        let started = Instant::now();
        engine.start_search(SearchLimits::movetime(100)).expect("search should start");
        engine.wait().expect("worker should join");
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(best_moves(&rx).len(), 1);
    }

    #[test]
    fn mutation_cancels_running_search() {
        let (mut engine, rx) = engine();
        engine.start_search(SearchLimits::infinite()).expect("search should start");
        engine.apply_move("e2e4").expect("move should apply");
        assert!(!engine.is_searching());
        assert_eq!(best_moves(&rx).len(), 1);
        assert_eq!(
            engine.fen().expect("fen should read"),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[test]
    fn rejected_input_leaves_state_alone() {
        let (mut engine, _rx) = engine();
        engine.apply_move("e2e4").expect("move should apply");
        let before = engine.fen().expect("fen should read");

        assert!(matches!(engine.apply_move("e2e5"), Err(EngineError::InvalidMove(_))));
        assert!(matches!(engine.set_position("not a fen"), Err(EngineError::InvalidFen(_))));
        assert!(matches!(
            engine.resize_table(0),
            Err(EngineError::HashSizeOutOfRange { .. })
        ));
        assert_eq!(engine.fen().expect("fen should read"), before);
    }

    #[test]
    fn config_changes_aspiration_behaviour() {
        let (mut engine, rx) = engine();
        engine
            .set_position("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1")
            .expect("FEN should parse");

        let wide = SearchConfig {
            aspiration_window: 100_000,
            ..SearchConfig::default()
        };
        engine.set_config(wide).expect("config should apply");
        assert_eq!(engine.config().expect("config should read"), wide);
        engine.start_search(SearchLimits::depth(7)).expect("search should start");
        engine.wait().expect("worker should join");
        assert!(rx
            .try_iter()
            .all(|e| !matches!(e, SearchEvent::Info(r) if r.bound != Bound::Exact)));

        let narrow = SearchConfig {
            aspiration_window: 1,
            ..SearchConfig::default()
        };
        engine.set_config(narrow).expect("config should apply");
        assert_eq!(engine.config().expect("config should read"), narrow);
        engine.new_game().expect("new game should reset");
        engine
            .set_position("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1")
            .expect("FEN should parse");
        engine.start_search(SearchLimits::depth(7)).expect("search should start");
        engine.wait().expect("worker should join");
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, SearchEvent::Info(r) if r.bound != Bound::Exact)));
    }

    #[test]
    fn checkmated_position_reports_null_move() {
        let (mut engine, rx) = engine();
        engine
            .set_position("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1")
            .expect("FEN should parse");
        engine.start_search(SearchLimits::depth(4)).expect("search should start");
        engine.wait().expect("worker should join");
        assert_eq!(best_moves(&rx), vec![Move::NULL]);
    }

    #[test]
    fn new_game_resets_position_and_perft_counts() {
        let (mut engine, _rx) = engine();
        engine.apply_move("g1f3").expect("move should apply");
        engine.new_game().expect("new game should reset");
        assert_eq!(engine.fen().expect("fen should read"), STARTING_POSITION_FEN);

        let split = engine.perft(2).expect("perft should run");
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|(_, n)| n).sum::<u64>(), 400);
    }
}
