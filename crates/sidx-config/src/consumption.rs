//! Config consumption map + unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix counts as read; every other leaf is reported as unused, which catches
//! typos such as `source:` misspelled as `sorce:` before a run silently
//! ignores them.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::collect_leaf_pointers;

/// Which command is reading the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    /// The sync config file. `sidx sync` and the `db` commands both read it,
    /// so they share one registry.
    Sync,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::Sync => "SYNC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub scope: String,
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Registry of consumed JSON-pointer prefixes per scope.
///
/// Must reflect what the code actually reads:
/// - sidx-config::SyncConfig  /database/url_env, /fetch/timeout_secs,
///   /sources/<name>/source, /sources/<name>/files
pub fn consumed_pointers_for_scope(scope: ConfigScope) -> &'static [&'static str] {
    match scope {
        ConfigScope::Sync => &["/database/url_env", "/fetch/timeout_secs", "/sources"],
    }
}

/// Produce an unused-key report for a given scope.
/// `Fail` returns an error when unused keys exist; `Warn` always returns the report.
///
/// Source entries are checked one level deeper than the `/sources` prefix:
/// only `source` and `files` are recognised inside each named source.
pub fn report_unused_keys(
    scope: ConfigScope,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let mut consumed: BTreeSet<String> = BTreeSet::new();
    for p in consumed_pointers_for_scope(scope) {
        consumed.insert(normalize_pointer(p));
    }
    let consumed_prefixes: Vec<String> = consumed.iter().cloned().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = Vec::new();
    'leaf: for lp in leaves {
        if lp.starts_with("/sources/") && !is_known_source_leaf(&lp) {
            unused.push(lp);
            continue;
        }
        for cp in &consumed_prefixes {
            if is_prefix_pointer(cp, &lp) {
                continue 'leaf;
            }
        }
        unused.push(lp);
    }

    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        scope: scope.as_str().to_string(),
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS (scope={}): {} unused config leaf key(s) detected. \
            Remove them or update the consumed registry. First few: {}",
            report.scope,
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

/// `/sources/<name>/source` or `/sources/<name>/files/<i>`.
fn is_known_source_leaf(leaf: &str) -> bool {
    let mut parts = leaf.trim_start_matches('/').split('/').skip(2);
    matches!(parts.next(), Some("source") | Some("files"))
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// Return true if `prefix` is a JSON-pointer prefix of `leaf`.
///
/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix)
        && leaf
            .get(prefix.len()..prefix.len() + 1)
            .map(|c| c == "/")
            .unwrap_or(false)
}

fn preview_list(items: &[String], n: usize) -> String {
    let take = items.iter().take(n).cloned().collect::<Vec<_>>();
    format!("{:?}", take)
}
