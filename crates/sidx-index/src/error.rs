use std::fmt;

use crate::{Key, Phase};

/// Contract violations surfaced by [`crate::ReconciliationIndex`].
///
/// Both variants are caller bugs, not runtime conditions: the index rejects the
/// call and leaves its state exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// `load` received a key that is not strictly greater than its predecessor.
    /// `last` is the key the offending key was compared with, either the last
    /// stored key or the previous key of the same batch.
    OrderingViolation { last: Key, got: Key },

    /// An ingest-phase operation was called after enumeration began.
    PhaseViolation {
        operation: &'static str,
        phase: Phase,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::OrderingViolation { last, got } => write!(
                f,
                "ordering violation: key {got} is not greater than preceding key {last}"
            ),
            IndexError::PhaseViolation { operation, phase } => write!(
                f,
                "phase violation: {operation} is not allowed while {phase}"
            ),
        }
    }
}

impl std::error::Error for IndexError {}
