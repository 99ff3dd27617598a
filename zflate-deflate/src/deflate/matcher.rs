//! Hash-chain match finder and the per-level tuning table.
//!
//! Every position with at least three bytes of lookahead is hashed into
//! `head`; `prev` links each position to the previous one with the same
//! hash. Positions are absolute stream offsets, so chains never need to be
//! rebased as the window slides.

use crate::tables::{MAX_MATCH, MIN_MATCH};
use zflate_core::window::Window;

/// Size of the hash table (power of 2).
const HASH_SIZE: usize = 32768;

/// Hash mask.
const HASH_MASK: usize = HASH_SIZE - 1;

/// Empty chain slot.
const NIL: u64 = u64::MAX;

/// Length-3 matches farther back than this are not worth a lazy search.
pub(crate) const TOO_FAR: u64 = 4096;

/// Parsing strategy selected by the compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// Level 0: stored blocks only.
    Stored,
    /// Levels 1-3: take the first acceptable match.
    Greedy,
    /// Levels 4-9: defer a match by one byte when the next one is longer.
    Lazy,
}

/// Search parameters of one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LevelConfig {
    /// Quarter the chain search once a match this long is in hand.
    pub good_length: usize,
    /// Lazy levels: skip the search when the previous match is this long.
    /// Greedy levels: only matches up to this long are hashed.
    pub max_lazy: usize,
    /// Stop searching at a match this long.
    pub nice_length: usize,
    /// Maximum number of chain links followed.
    pub max_chain: usize,
    /// Parsing strategy.
    pub strategy: Strategy,
}

impl LevelConfig {
    /// Parameters for `level` (0-9).
    pub(crate) fn for_level(level: u8) -> Self {
        use Strategy::{Greedy, Lazy, Stored};
        let (good_length, max_lazy, nice_length, max_chain, strategy) = match level {
            0 => (0, 0, 0, 0, Stored),
            1 => (4, 4, 8, 4, Greedy),
            2 => (4, 5, 16, 8, Greedy),
            3 => (4, 6, 32, 32, Greedy),
            4 => (4, 4, 16, 16, Lazy),
            5 => (8, 16, 32, 32, Lazy),
            6 => (8, 16, 128, 128, Lazy),
            7 => (8, 32, 128, 256, Lazy),
            8 => (32, 128, 258, 1024, Lazy),
            _ => (32, 258, 258, 4096, Lazy),
        };
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            strategy,
        }
    }
}

/// Hash chains over the positions of a deflate window.
#[derive(Debug)]
pub(crate) struct Matcher {
    head: Vec<u64>,
    prev: Vec<u64>,
    window_mask: usize,
    /// Farthest distance a match may reach.
    max_distance: u64,
    /// No match may start before this position.
    floor: u64,
    config: LevelConfig,
}

impl Matcher {
    /// Chains for a history of `window_size` bytes.
    pub(crate) fn new(window_size: usize, config: LevelConfig) -> Self {
        Self {
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; window_size],
            window_mask: window_size - 1,
            max_distance: window_size as u64 - 1,
            floor: 0,
            config,
        }
    }

    pub(crate) fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Forget every position.
    pub(crate) fn reset(&mut self) {
        self.head.fill(NIL);
        self.prev.fill(NIL);
        self.floor = 0;
    }

    /// Forget the history before `position`; later matches never reach back
    /// across it.
    pub(crate) fn forget_before(&mut self, position: u64) {
        self.head.fill(NIL);
        self.floor = position;
    }

    /// Multiplicative hash of three bytes.
    #[inline(always)]
    fn hash(b0: u8, b1: u8, b2: u8) -> usize {
        let h = (usize::from(b0).wrapping_mul(506832829))
            ^ (usize::from(b1).wrapping_mul(2654435761) << 8)
            ^ (usize::from(b2).wrapping_mul(374761393) << 16);
        (h ^ (h >> 15)) & HASH_MASK
    }

    /// Insert `pos` and return the previous chain head, if any.
    ///
    /// Positions without three bytes in the window are not hashed.
    pub(crate) fn insert(&mut self, window: &Window, pos: u64) -> Option<u64> {
        if pos + 2 >= window.total_written() {
            return None;
        }
        let h = Self::hash(window.get(pos), window.get(pos + 1), window.get(pos + 2));
        let previous = self.head[h];
        self.prev[pos as usize & self.window_mask] = previous;
        self.head[h] = pos;
        (previous != NIL).then_some(previous)
    }

    /// True when a chain candidate may be used for a match at `scan`.
    pub(crate) fn in_reach(&self, scan: u64, candidate: u64) -> bool {
        candidate < scan && candidate >= self.floor && scan - candidate <= self.max_distance
    }

    /// Longest match at `scan` along the chain starting at `candidate`.
    ///
    /// Returns `(length, start)` only for a match longer than `prev_length`.
    pub(crate) fn longest_match(
        &self,
        window: &Window,
        scan: u64,
        mut candidate: u64,
        prev_length: usize,
    ) -> Option<(usize, u64)> {
        let lookahead = (window.total_written() - scan) as usize;
        let max_len = MAX_MATCH.min(lookahead);
        let nice = self.config.nice_length.min(max_len);
        let mut chain = self.config.max_chain;
        if prev_length >= self.config.good_length {
            chain >>= 2;
        }

        let mut best_len = prev_length.max(MIN_MATCH - 1);
        let mut best_start = None;

        while chain > 0 && best_len < max_len && self.in_reach(scan, candidate) {
            // Quick rejection on the byte that would extend the best match
            if window.get(candidate + best_len as u64) == window.get(scan + best_len as u64) {
                let len = (0..max_len as u64)
                    .take_while(|&k| window.get(candidate + k) == window.get(scan + k))
                    .count();
                if len > best_len {
                    best_len = len;
                    best_start = Some(candidate);
                    if len >= nice {
                        break;
                    }
                }
            }

            chain -= 1;
            let next = self.prev[candidate as usize & self.window_mask];
            if next == NIL || next >= candidate {
                break;
            }
            candidate = next;
        }

        best_start.map(|start| (best_len, start))
    }
}
