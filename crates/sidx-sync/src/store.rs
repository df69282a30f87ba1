//! Persistence seam for the sync driver.

use anyhow::{anyhow, Result};
use sidx_db::{BaselineRow, RuleWrite};
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Statements the driver needs from the backing store.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    /// Known rules, ascending by sid.
    async fn baseline(&self) -> Result<Vec<BaselineRow>>;
    async fn insert(&self, rule: &RuleWrite) -> Result<()>;
    async fn update(&self, rule: &RuleWrite) -> Result<()>;
    async fn reactivate(&self, rule: &RuleWrite) -> Result<()>;
    async fn deactivate(&self, sid: i64) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl RuleStore for PgRuleStore {
    async fn baseline(&self) -> Result<Vec<BaselineRow>> {
        sidx_db::fetch_baseline(&self.pool).await
    }

    async fn insert(&self, rule: &RuleWrite) -> Result<()> {
        sidx_db::insert_rule(&self.pool, rule).await
    }

    async fn update(&self, rule: &RuleWrite) -> Result<()> {
        sidx_db::update_rule(&self.pool, rule).await
    }

    async fn reactivate(&self, rule: &RuleWrite) -> Result<()> {
        sidx_db::reactivate_rule(&self.pool, rule).await
    }

    async fn deactivate(&self, sid: i64) -> Result<()> {
        sidx_db::deactivate_rule(&self.pool, sid).await
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// A stored rule in [`MemoryRuleStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemRule {
    pub rev: i32,
    pub file: String,
    pub pattern: String,
    pub active: bool,
}

impl MemRule {
    pub fn active(rev: i32) -> Self {
        Self {
            rev,
            file: String::new(),
            pattern: String::new(),
            active: true,
        }
    }

    pub fn inactive(rev: i32) -> Self {
        Self {
            active: false,
            ..Self::active(rev)
        }
    }
}

/// Deterministic in-memory store with the same row semantics as the
/// Postgres schema. Sids listed with [`fail_on`](Self::fail_on) reject every
/// write, for exercising per-record failure handling.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: Mutex<BTreeMap<i64, MemRule>>,
    fail_on: Mutex<BTreeSet<i64>>,
    writes: Mutex<usize>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules<I: IntoIterator<Item = (i64, MemRule)>>(rules: I) -> Self {
        let s = Self::new();
        if let Ok(mut m) = s.rules.lock() {
            m.extend(rules);
        }
        s
    }

    pub fn fail_on(&self, sid: i64) {
        if let Ok(mut f) = self.fail_on.lock() {
            f.insert(sid);
        }
    }

    pub fn get(&self, sid: i64) -> Option<MemRule> {
        self.rules.lock().ok()?.get(&sid).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<i64, MemRule> {
        self.rules.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    fn write<F>(&self, sid: i64, op: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<i64, MemRule>) -> Result<()>,
    {
        let failing = self
            .fail_on
            .lock()
            .map_err(|_| anyhow!("fail_on lock poisoned"))?
            .contains(&sid);
        if failing {
            return Err(anyhow!("{op}: injected failure for sid={sid}"));
        }
        let mut rules = self.rules.lock().map_err(|_| anyhow!("rules lock poisoned"))?;
        f(&mut *rules)?;
        *self.writes.lock().map_err(|_| anyhow!("writes lock poisoned"))? += 1;
        Ok(())
    }

    fn apply(&self, op: &str, rule: &RuleWrite, reactivate: bool) -> Result<()> {
        self.write(rule.sid, op, |rules| {
            let row = rules
                .get_mut(&rule.sid)
                .ok_or_else(|| anyhow!("{op}: no matching row for sid={}", rule.sid))?;
            row.rev = rule.rev;
            row.file = rule.file.clone();
            row.pattern = rule.pattern.clone();
            if reactivate {
                row.active = true;
            }
            Ok(())
        })
    }
}

#[async_trait::async_trait]
impl RuleStore for MemoryRuleStore {
    async fn baseline(&self) -> Result<Vec<BaselineRow>> {
        let rules = self.rules.lock().map_err(|_| anyhow!("rules lock poisoned"))?;
        Ok(rules
            .iter()
            .map(|(&sid, r)| BaselineRow {
                sid,
                rev: r.rev,
                active: r.active,
            })
            .collect())
    }

    async fn insert(&self, rule: &RuleWrite) -> Result<()> {
        self.write(rule.sid, "insert_rule", |rules| {
            if rules.contains_key(&rule.sid) {
                return Err(anyhow!("insert_rule: duplicate key sid={}", rule.sid));
            }
            rules.insert(
                rule.sid,
                MemRule {
                    rev: rule.rev,
                    file: rule.file.clone(),
                    pattern: rule.pattern.clone(),
                    active: true,
                },
            );
            Ok(())
        })
    }

    async fn update(&self, rule: &RuleWrite) -> Result<()> {
        self.apply("update_rule", rule, false)
    }

    async fn reactivate(&self, rule: &RuleWrite) -> Result<()> {
        self.apply("reactivate_rule", rule, true)
    }

    async fn deactivate(&self, sid: i64) -> Result<()> {
        self.write(sid, "deactivate_rule", |rules| match rules.get_mut(&sid) {
            Some(row) if row.active => {
                row.active = false;
                Ok(())
            }
            _ => Err(anyhow!("deactivate_rule: no matching row for sid={sid}")),
        })
    }
}
