use crate::{
    Entry, Hit, IndexError, Key, LocalitySearch, Phase, Revision, SearchStats, SearchStrategy,
};

#[derive(Clone, Debug)]
struct Slot<A> {
    revision: Revision,
    aux: A,
}

/// Internal state machine. `cursor` and `remaining` share no meaning, so they
/// live in separate states instead of one reused field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Ingesting {
        /// Position the last lookup ended on; `None` before the first lookup.
        cursor: Option<usize>,
    },
    Enumerating {
        /// Positions `0..remaining` have not been visited by enumeration yet.
        remaining: usize,
    },
}

/// Sorted baseline plus per-entry matched bits for one synchronization run.
///
/// Usage:
/// 1. [`load`](Self::load) the baseline in strictly ascending key order;
/// 2. [`lookup`](Self::lookup) every candidate key, in any order;
/// 3. drain [`next_unseen`](Self::next_unseen) until it returns `None`.
///
/// Step 3 is irreversible: once enumeration starts, `load` and `lookup` fail
/// with [`IndexError::PhaseViolation`].
///
/// Enumeration order is descending by key. Every unmatched key is returned
/// exactly once and matched keys are never returned.
#[derive(Clone, Debug)]
pub struct ReconciliationIndex<A, S = LocalitySearch> {
    keys: Vec<Key>,
    slots: Vec<Slot<A>>,
    matched: Vec<bool>,
    matched_count: usize,
    state: State,
    strategy: S,
    last_stats: SearchStats,
    total_stats: SearchStats,
}

impl<A> Default for ReconciliationIndex<A, LocalitySearch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ReconciliationIndex<A, LocalitySearch> {
    pub fn new() -> Self {
        Self::with_strategy(LocalitySearch::default())
    }
}

impl<A, S: SearchStrategy> ReconciliationIndex<A, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            keys: Vec::new(),
            slots: Vec::new(),
            matched: Vec::new(),
            matched_count: 0,
            state: State::Ingesting { cursor: None },
            strategy,
            last_stats: SearchStats::default(),
            total_stats: SearchStats::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Append one baseline entry. The key must exceed the last stored key.
    pub fn insert(&mut self, entry: Entry<A>) -> Result<(), IndexError> {
        self.require_ingesting("insert")?;
        if let Some(&last) = self.keys.last() {
            if entry.key <= last {
                return Err(IndexError::OrderingViolation {
                    last,
                    got: entry.key,
                });
            }
        }
        self.push(entry);
        Ok(())
    }

    /// Append a batch of baseline entries.
    ///
    /// The whole batch is validated before any entry is stored, so a rejected
    /// batch leaves the index unchanged. Returns the number of entries added.
    pub fn load<I>(&mut self, entries: I) -> Result<usize, IndexError>
    where
        I: IntoIterator<Item = Entry<A>>,
    {
        self.require_ingesting("load")?;

        let batch: Vec<Entry<A>> = entries.into_iter().collect();
        let mut prev = self.keys.last().copied();
        for e in &batch {
            if let Some(last) = prev {
                if e.key <= last {
                    return Err(IndexError::OrderingViolation { last, got: e.key });
                }
            }
            prev = Some(e.key);
        }

        let n = batch.len();
        self.keys.reserve(n);
        self.slots.reserve(n);
        self.matched.reserve(n);
        for e in batch {
            self.push(e);
        }
        Ok(n)
    }

    fn push(&mut self, entry: Entry<A>) {
        self.keys.push(entry.key);
        self.slots.push(Slot {
            revision: entry.revision,
            aux: entry.aux,
        });
        self.matched.push(false);
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    /// Find `key` in the baseline.
    ///
    /// On a hit the entry is marked as matched and its stored revision and
    /// auxiliary state are returned. A miss returns `Ok(None)` and changes no
    /// matched bit. Repeated lookups of the same key keep returning the same
    /// data.
    pub fn lookup(&mut self, key: Key) -> Result<Option<Hit<'_, A>>, IndexError> {
        let cursor = match self.state {
            State::Ingesting { cursor } => cursor,
            State::Enumerating { .. } => {
                return Err(IndexError::PhaseViolation {
                    operation: "lookup",
                    phase: Phase::Enumerating,
                })
            }
        };

        self.last_stats = SearchStats::default();
        if self.keys.is_empty() {
            return Ok(None);
        }

        let mut stats = SearchStats::default();
        let pos = self
            .strategy
            .position(&self.keys, cursor.unwrap_or(0), key, &mut stats);
        self.last_stats = stats;
        self.total_stats += stats;
        self.state = State::Ingesting { cursor: Some(pos) };

        if self.keys[pos] != key {
            return Ok(None);
        }

        if !self.matched[pos] {
            self.matched[pos] = true;
            self.matched_count += 1;
        }
        let slot = &self.slots[pos];
        Ok(Some(Hit {
            key,
            revision: slot.revision,
            aux: &slot.aux,
        }))
    }

    // -----------------------------------------------------------------------
    // Enumerate
    // -----------------------------------------------------------------------

    /// Next baseline key that no lookup matched, or `None` once exhausted.
    ///
    /// The first call ends the ingest phase. Keys come out in descending
    /// order; after `None` every further call returns `None` as well.
    pub fn next_unseen(&mut self) -> Option<Key> {
        let mut remaining = match self.state {
            State::Ingesting { .. } => self.keys.len(),
            State::Enumerating { remaining } => remaining,
        };

        while remaining > 0 {
            remaining -= 1;
            if !self.matched[remaining] {
                self.state = State::Enumerating { remaining };
                return Some(self.keys[remaining]);
            }
        }

        self.state = State::Enumerating { remaining: 0 };
        None
    }

    /// Iterator over the remaining unseen keys. Enters the enumeration phase
    /// on the first `next()`.
    pub fn unseen(&mut self) -> Unseen<'_, A, S> {
        Unseen { index: self }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Ingesting { .. } => Phase::Ingesting,
            State::Enumerating { .. } => Phase::Enumerating,
        }
    }

    /// Key under the ingest cursor. `None` before the first lookup, on an
    /// empty index and during enumeration.
    pub fn cursor_key(&self) -> Option<Key> {
        match self.state {
            State::Ingesting { cursor: Some(p) } => self.keys.get(p).copied(),
            _ => None,
        }
    }

    /// Stored data for `key` without marking it and without moving the
    /// cursor. Allowed in both phases.
    pub fn get(&self, key: Key) -> Option<Hit<'_, A>> {
        let p = self.keys.binary_search(&key).ok()?;
        let slot = &self.slots[p];
        Some(Hit {
            key,
            revision: slot.revision,
            aux: &slot.aux,
        })
    }

    pub fn is_matched(&self, key: Key) -> bool {
        self.keys
            .binary_search(&key)
            .map(|p| self.matched[p])
            .unwrap_or(false)
    }

    pub fn matched_count(&self) -> usize {
        self.matched_count
    }

    pub fn unmatched_count(&self) -> usize {
        self.keys.len() - self.matched_count
    }

    /// Work done by the most recent lookup.
    pub fn last_stats(&self) -> SearchStats {
        self.last_stats
    }

    /// Work done by all lookups of this run.
    pub fn total_stats(&self) -> SearchStats {
        self.total_stats
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    fn require_ingesting(&self, operation: &'static str) -> Result<(), IndexError> {
        match self.state {
            State::Ingesting { .. } => Ok(()),
            State::Enumerating { .. } => Err(IndexError::PhaseViolation {
                operation,
                phase: Phase::Enumerating,
            }),
        }
    }
}

/// Draining iterator returned by [`ReconciliationIndex::unseen`].
pub struct Unseen<'a, A, S> {
    index: &'a mut ReconciliationIndex<A, S>,
}

impl<A, S: SearchStrategy> Iterator for Unseen<'_, A, S> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        self.index.next_unseen()
    }
}
