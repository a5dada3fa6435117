//! Fixed-size transposition table keyed by Zobrist hash.
//!
//! Direct indexing (`key % len`) with unconditional overwrite. The full key is
//! kept in each slot so a probe only reports a hit on an exact key match; the
//! caller still treats the stored move as advisory and validates it.
//!
//! Mate scores are stored relative to the node (`score_to_tt`) and re-biased
//! by the probing ply (`score_from_tt`).

use crate::errors::{EngineError, EngineResult};
use crate::moves::chess_move::Move;

pub const MIN_HASH_MB: usize = 1;
pub const MAX_HASH_MB: usize = 128;
pub const DEFAULT_HASH_MB: usize = 16;

pub const MATE_SCORE: i32 = 30_000;
/// Any score at or beyond this magnitude encodes a forced mate.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Move,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    size_mb: usize,
    stats: TTStats,
}

impl TranspositionTable {
    pub fn new_with_mb(size_mb: usize) -> EngineResult<Self> {
        let entries = allocate(size_mb)?;
        Ok(Self {
            entries,
            size_mb,
            stats: TTStats::default(),
        })
    }

    /// Reallocate to `size_mb`, dropping every entry. An out-of-range size is
    /// rejected before allocating and leaves the current table intact.
    pub fn resize(&mut self, size_mb: usize) -> EngineResult<()> {
        self.entries = allocate(size_mb)?;
        self.size_mb = size_mb;
        self.stats = TTStats::default();
        Ok(())
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.fill(None);
        self.stats = TTStats::default();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn size_mb(&self) -> usize {
        self.size_mb
    }

    #[inline]
    pub fn stats(&self) -> TTStats {
        self.stats
    }

    /// Occupied slots per mille, sampled over the first thousand slots.
    pub fn hashfull(&self) -> u32 {
        let sample = self.entries.len().min(1000);
        let used = self.entries[..sample].iter().filter(|e| e.is_some()).count();
        (used * 1000 / sample.max(1)) as u32
    }

    #[inline]
    fn idx(&self, key: u64) -> usize {
        (key % self.entries.len() as u64) as usize
    }

    pub fn probe(&mut self, key: u64) -> Option<TTEntry> {
        self.stats.probes += 1;
        let hit = self.entries[self.idx(key)].filter(|e| e.key == key);
        if hit.is_some() {
            self.stats.hits += 1;
        }
        hit
    }

    pub fn store(&mut self, entry: TTEntry) {
        self.stats.stores += 1;
        let idx = self.idx(entry.key);
        self.entries[idx] = Some(entry);
    }
}

fn allocate(size_mb: usize) -> EngineResult<Vec<Option<TTEntry>>> {
    if !(MIN_HASH_MB..=MAX_HASH_MB).contains(&size_mb) {
        return Err(EngineError::HashSizeOutOfRange {
            requested: size_mb,
            min: MIN_HASH_MB,
            max: MAX_HASH_MB,
        });
    }
    let entry_size = std::mem::size_of::<Option<TTEntry>>();
    let count = (size_mb * 1024 * 1024 / entry_size).max(1);
    Ok(vec![None; count])
}

/// Convert a search score at `ply` into its node-relative stored form.
#[inline]
pub fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Inverse of `score_to_tt` for a probe made at `ply`.
#[inline]
pub fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}
