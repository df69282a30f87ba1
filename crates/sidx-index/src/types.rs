use std::fmt;
use std::ops::AddAssign;

/// Record identifier. Unique within a baseline.
pub type Key = u64;

/// Record revision. Non-decreasing per key across runs.
pub type Revision = i32;

/// One baseline record as supplied to [`crate::ReconciliationIndex::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<A> {
    pub key: Key,
    pub revision: Revision,
    /// Caller payload. Stored and handed back, never inspected by the index.
    pub aux: A,
}

impl<A> Entry<A> {
    pub fn new(key: Key, revision: Revision, aux: A) -> Self {
        Self { key, revision, aux }
    }
}

/// Successful lookup: the stored data of the matched baseline entry.
#[derive(Debug, PartialEq, Eq)]
pub struct Hit<'a, A> {
    pub key: Key,
    pub revision: Revision,
    pub aux: &'a A,
}

impl<A> Clone for Hit<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Hit<'_, A> {}

/// Run phase. The only transition is `Ingesting -> Enumerating`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Ingesting,
    Enumerating,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Ingesting => "INGESTING",
            Phase::Enumerating => "ENUMERATING",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work performed by a positioned search.
///
/// `bisect_steps` counts halvings of the search interval, `scan_steps` counts
/// single-position moves of the linear scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub bisect_steps: u32,
    pub scan_steps: u32,
}

impl SearchStats {
    pub fn bisected(&self) -> bool {
        self.bisect_steps > 0
    }
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.bisect_steps = self.bisect_steps.saturating_add(rhs.bisect_steps);
        self.scan_steps = self.scan_steps.saturating_add(rhs.scan_steps);
    }
}
