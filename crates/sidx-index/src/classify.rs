use std::fmt;

use crate::{Hit, IndexError, Key, ReconciliationIndex, Revision, SearchStrategy};

/// What a candidate record means relative to the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    /// Key absent from the baseline.
    New,
    /// Key present and active, revision not newer than the stored one.
    Unchanged,
    /// Key present and active, candidate revision newer than the stored one.
    Updated,
    /// Key present but marked inactive in the baseline.
    Reactivated,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::New => "NEW",
            Classification::Unchanged => "UNCHANGED",
            Classification::Updated => "UPDATED",
            Classification::Reactivated => "REACTIVATED",
        }
    }

    /// `true` when the caller has something to persist.
    pub fn needs_write(&self) -> bool {
        !matches!(self, Classification::Unchanged)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary state that knows whether its record is currently active.
///
/// Payloads that carry no activity notion can use `()`, which is always
/// active.
pub trait Liveness {
    fn is_active(&self) -> bool;
}

impl Liveness for bool {
    fn is_active(&self) -> bool {
        *self
    }
}

impl Liveness for () {
    fn is_active(&self) -> bool {
        true
    }
}

/// Classify a candidate revision against the result of a lookup.
///
/// Reactivation takes precedence over revision comparison: an inactive record
/// that reappears is reactivated even when its revision did not move.
pub fn classify<A: Liveness>(hit: Option<&Hit<'_, A>>, candidate_rev: Revision) -> Classification {
    match hit {
        None => Classification::New,
        Some(h) if !h.aux.is_active() => Classification::Reactivated,
        Some(h) if candidate_rev > h.revision => Classification::Updated,
        Some(_) => Classification::Unchanged,
    }
}

impl<A: Liveness, S: SearchStrategy> ReconciliationIndex<A, S> {
    /// Look up `key` and classify `candidate_rev` against the stored entry.
    pub fn reconcile(
        &mut self,
        key: Key,
        candidate_rev: Revision,
    ) -> Result<Classification, IndexError> {
        let hit = self.lookup(key)?;
        Ok(classify(hit.as_ref(), candidate_rev))
    }
}
