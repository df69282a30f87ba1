//! Positioned search strategies.
//!
//! A strategy receives the sorted key column, the position the previous lookup
//! ended on, and the target key. It returns a position that holds the target
//! whenever the target is present. The index decides what a hit means; the
//! strategy only moves.

use crate::{Key, SearchStats};

/// Key distance (and interval width) below which [`LocalitySearch`] stops
/// bisecting and scans linearly.
pub const DEFAULT_LOCALITY_THRESHOLD: u64 = 10;

/// Search from a starting position over a strictly ascending, non-empty slice.
///
/// Contract: the returned position `p` satisfies `p < keys.len()`, and
/// `keys[p] == key` whenever `key` occurs in `keys`. Implementations must not
/// assume anything about `start` beyond `start < keys.len()`.
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    fn position(&self, keys: &[Key], start: usize, key: Key, stats: &mut SearchStats) -> usize;
}

impl<S: SearchStrategy + ?Sized> SearchStrategy for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn position(&self, keys: &[Key], start: usize, key: Key, stats: &mut SearchStats) -> usize {
        (**self).position(keys, start, key, stats)
    }
}

// ---------------------------------------------------------------------------
// Locality-first
// ---------------------------------------------------------------------------

/// Locality-first search: bisect only while the target is far from the
/// current position, then finish with a short linear scan.
///
/// Ingestion streams tend to visit keys close to their predecessors, so most
/// lookups resolve in a handful of scan steps without touching the bisection
/// loop at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalitySearch {
    threshold: u64,
}

impl Default for LocalitySearch {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALITY_THRESHOLD)
    }
}

impl LocalitySearch {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    fn is_far(&self, from: Key, to: Key) -> bool {
        from.abs_diff(to) > self.threshold
    }
}

impl SearchStrategy for LocalitySearch {
    fn name(&self) -> &'static str {
        "locality"
    }

    fn position(&self, keys: &[Key], start: usize, key: Key, stats: &mut SearchStats) -> usize {
        let last = keys.len() - 1;
        // Interval width must stay >= 2 for the midpoint to make progress.
        let span = usize::try_from(self.threshold).unwrap_or(usize::MAX).max(1);

        let mut pos = start.min(last);
        let (mut lo, mut hi) = (0usize, last);

        while hi - lo > span {
            let here = keys[pos];
            if !self.is_far(here, key) {
                break;
            }
            if key > here {
                lo = pos;
            } else {
                hi = pos;
            }
            pos = lo + (hi - lo) / 2;
            stats.bisect_steps += 1;
        }

        while pos < last && key > keys[pos] {
            pos += 1;
            stats.scan_steps += 1;
        }
        while pos > 0 && key < keys[pos] {
            pos -= 1;
            stats.scan_steps += 1;
        }
        pos
    }
}

// ---------------------------------------------------------------------------
// Plain bisection
// ---------------------------------------------------------------------------

/// Conventional lower-bound binary search over the whole slice. Ignores the
/// starting position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinarySearch;

impl SearchStrategy for BinarySearch {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn position(&self, keys: &[Key], _start: usize, key: Key, stats: &mut SearchStats) -> usize {
        let (mut lo, mut hi) = (0usize, keys.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            stats.bisect_steps += 1;
            if keys[mid] < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.min(keys.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(n: u64) -> Vec<Key> {
        (0..n).collect()
    }

    #[test]
    fn locality_near_target_scans_only() {
        let keys = dense(1_000);
        let mut stats = SearchStats::default();
        let p = LocalitySearch::default().position(&keys, 500, 503, &mut stats);
        assert_eq!(keys[p], 503);
        assert_eq!(stats.bisect_steps, 0);
        assert_eq!(stats.scan_steps, 3);
    }

    #[test]
    fn locality_far_target_bisects() {
        let keys = dense(1_000);
        let mut stats = SearchStats::default();
        let p = LocalitySearch::default().position(&keys, 0, 900, &mut stats);
        assert_eq!(keys[p], 900);
        assert!(stats.bisect_steps > 0);
    }

    #[test]
    fn locality_zero_threshold_terminates() {
        let keys: Vec<Key> = (0..64).map(|k| k * 3).collect();
        let s = LocalitySearch::new(0);
        for target in 0..200 {
            let mut stats = SearchStats::default();
            let p = s.position(&keys, 17, target, &mut stats);
            if target % 3 == 0 && target < 192 {
                assert_eq!(keys[p], target);
            } else {
                assert_ne!(keys[p], target);
            }
        }
    }

    #[test]
    fn locality_absent_key_brackets() {
        let keys = vec![10, 20, 30, 40];
        let mut stats = SearchStats::default();
        let p = LocalitySearch::default().position(&keys, 3, 25, &mut stats);
        assert!(keys[p] == 20 || keys[p] == 30);
    }

    #[test]
    fn binary_finds_every_key_and_clamps_past_end() {
        let keys: Vec<Key> = (1..=50).map(|k| k * 2).collect();
        for &k in &keys {
            let mut stats = SearchStats::default();
            let p = BinarySearch.position(&keys, 0, k, &mut stats);
            assert_eq!(keys[p], k);
        }
        let mut stats = SearchStats::default();
        assert_eq!(BinarySearch.position(&keys, 0, 1_000, &mut stats), keys.len() - 1);
    }
}
