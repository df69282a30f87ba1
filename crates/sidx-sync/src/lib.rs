//! sidx-sync
//!
//! One synchronization run: seed a [`ReconciliationIndex`] with the known
//! rules, feed it every rule read from the configured sources, write what
//! changed and soft-delete what disappeared.
//!
//! Guarantees:
//! - every source is fetched before the first write; a source that cannot be
//!   fetched, or lacks an allow-listed file, aborts the run with the store
//!   untouched
//! - a failed write for one rule is logged and counted, the run continues
//! - a rule id seen twice in one run is persisted once (first occurrence wins)
//! - a known rule absent from every source is deactivated, never deleted

mod fixture;
mod store;

pub use fixture::StaticFetcher;
pub use store::{MemRule, MemoryRuleStore, PgRuleStore, RuleStore};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sidx_config::SyncConfig;
use sidx_db::RuleWrite;
use sidx_index::{Classification, Entry, Liveness, ReconciliationIndex};
use sidx_source::{decode_file, Candidate, FetchedSource, SourceFetcher};
use std::collections::HashSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Per-rule state kept in the index next to the stored revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleState {
    pub active: bool,
}

impl Liveness for RuleState {
    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Classify and report, write nothing.
    pub dry_run: bool,
}

/// Outcome of one run. Counters only include successful writes (or, in a
/// dry run, writes that would have been issued).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Known rules loaded before ingesting.
    pub baseline: usize,
    pub sources: usize,
    pub files: usize,
    pub new: usize,
    pub updated: usize,
    pub reactivated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub duplicates: usize,
    /// Blank, comment, non-alert and undecodable lines.
    pub skipped_lines: usize,
    pub failures: usize,
}

impl SyncReport {
    fn started(run_id: Uuid, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            dry_run,
            started_at: now,
            finished_at: now,
            baseline: 0,
            sources: 0,
            files: 0,
            new: 0,
            updated: 0,
            reactivated: 0,
            unchanged: 0,
            removed: 0,
            duplicates: 0,
            skipped_lines: 0,
            failures: 0,
        }
    }

    /// No write failed.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }

    fn count(&mut self, class: Classification) {
        match class {
            Classification::New => self.new += 1,
            Classification::Updated => self.updated += 1,
            Classification::Reactivated => self.reactivated += 1,
            Classification::Unchanged => self.unchanged += 1,
        }
    }
}

/// Drives one run against a store and a source fetcher.
pub struct Synchronizer<St, F> {
    store: St,
    fetcher: F,
    options: SyncOptions,
}

impl<St: RuleStore, F: SourceFetcher> Synchronizer<St, F> {
    pub fn new(store: St, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub async fn run(&self, cfg: &SyncConfig) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync", %run_id, dry_run = self.options.dry_run);
        self.run_inner(run_id, cfg).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, cfg: &SyncConfig) -> Result<SyncReport> {
        let mut report = SyncReport::started(run_id, self.options.dry_run);
        info!(sources = cfg.sources.len(), "sync started");

        let mut index = self.load_baseline().await?;
        report.baseline = index.len();

        let mut fetched: Vec<FetchedSource> = Vec::with_capacity(cfg.sources.len());
        for (name, src) in &cfg.sources {
            let f = self
                .fetcher
                .fetch(name, src)
                .await
                .with_context(|| format!("SYNC_SOURCE_FETCH_FAILED source='{name}'"))?;
            // Rules of an absent file would all be reported as removed.
            if !f.missing.is_empty() {
                bail!(
                    "SYNC_SOURCE_FETCH_FAILED source='{}' missing={:?}",
                    name,
                    f.missing
                );
            }
            fetched.push(f);
        }
        report.sources = fetched.len();

        let mut seen: HashSet<u64> = HashSet::new();
        for source in &fetched {
            for file in &source.files {
                report.files += 1;
                let decoded = decode_file(file);
                report.skipped_lines += decoded.ignored_lines + decoded.invalid_lines;
                debug!(
                    file = %file.file_id,
                    candidates = decoded.candidates.len(),
                    "file decoded"
                );
                for c in &decoded.candidates {
                    self.ingest(&mut index, &mut seen, c, &mut report).await?;
                }
            }
        }

        self.remove_unseen(&mut index, &mut report).await?;

        let stats = index.total_stats();
        report.finished_at = Utc::now();
        info!(
            new = report.new,
            updated = report.updated,
            reactivated = report.reactivated,
            unchanged = report.unchanged,
            removed = report.removed,
            duplicates = report.duplicates,
            skipped_lines = report.skipped_lines,
            failures = report.failures,
            bisect_steps = stats.bisect_steps,
            scan_steps = stats.scan_steps,
            "sync finished"
        );
        Ok(report)
    }

    async fn load_baseline(&self) -> Result<ReconciliationIndex<RuleState>> {
        let rows = self.store.baseline().await.context("load baseline")?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key = u64::try_from(row.sid)
                .with_context(|| format!("SYNC_INVALID_BASELINE sid={} is negative", row.sid))?;
            entries.push(Entry::new(key, row.rev, RuleState { active: row.active }));
        }

        let mut index = ReconciliationIndex::new();
        index
            .load(entries)
            .context("SYNC_INVALID_BASELINE baseline is not strictly ascending")?;
        info!(rules = index.len(), "baseline loaded");
        Ok(index)
    }

    async fn ingest(
        &self,
        index: &mut ReconciliationIndex<RuleState>,
        seen: &mut HashSet<u64>,
        c: &Candidate,
        report: &mut SyncReport,
    ) -> Result<()> {
        let Ok(sid) = i64::try_from(c.sid) else {
            warn!(file = %c.file_id, line_no = c.line_no, sid = c.sid, "sid out of range, rule skipped");
            report.skipped_lines += 1;
            return Ok(());
        };
        if !seen.insert(c.sid) {
            warn!(file = %c.file_id, line_no = c.line_no, sid = c.sid, "duplicate sid ignored");
            report.duplicates += 1;
            return Ok(());
        }

        let class = index.reconcile(c.sid, c.rev)?;
        if !class.needs_write() || self.options.dry_run {
            report.count(class);
            return Ok(());
        }

        let write = RuleWrite {
            sid,
            rev: c.rev,
            file: c.file_id.clone(),
            pattern: c.line.clone(),
        };
        let res = match class {
            Classification::New => self.store.insert(&write).await,
            Classification::Updated => self.store.update(&write).await,
            Classification::Reactivated => self.store.reactivate(&write).await,
            Classification::Unchanged => Ok(()),
        };
        match res {
            Ok(()) => {
                debug!(sid, rev = c.rev, class = %class, "rule written");
                report.count(class);
            }
            Err(e) => {
                error!(sid, rev = c.rev, class = %class, file = %c.file_id, error = %format!("{e:#}"), "rule write failed");
                report.failures += 1;
            }
        }
        Ok(())
    }

    async fn remove_unseen(
        &self,
        index: &mut ReconciliationIndex<RuleState>,
        report: &mut SyncReport,
    ) -> Result<()> {
        while let Some(key) = index.next_unseen() {
            let active = index.get(key).map(|h| h.aux.active).unwrap_or(false);
            if !active {
                continue;
            }
            let sid = i64::try_from(key).context("baseline sid out of range")?;
            if self.options.dry_run {
                report.removed += 1;
                continue;
            }
            match self.store.deactivate(sid).await {
                Ok(()) => {
                    debug!(sid, "rule deactivated");
                    report.removed += 1;
                }
                Err(e) => {
                    error!(sid, error = %format!("{e:#}"), "rule deactivation failed");
                    report.failures += 1;
                }
            }
        }
        Ok(())
    }
}
