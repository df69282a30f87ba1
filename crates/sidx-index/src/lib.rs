//! sidx-index
//!
//! In-memory reconciliation index for one synchronization run.
//!
//! Architectural decisions:
//! - Baseline is loaded once, strictly ascending by key
//! - Lookups search from the last cursor position (key locality)
//! - Every matched key is marked; marks are never cleared within a run
//! - After ingestion the index enumerates never-matched keys (implicit removals)
//! - Ingest and enumeration are mutually exclusive phases
//!
//! Deterministic, pure logic. No IO. No persistence decisions.

mod classify;
mod error;
mod index;
mod search;
mod types;

pub use classify::{classify, Classification, Liveness};
pub use error::IndexError;
pub use index::{ReconciliationIndex, Unseen};
pub use search::{BinarySearch, LocalitySearch, SearchStrategy, DEFAULT_LOCALITY_THRESHOLD};
pub use types::*;
