use anyhow::{bail, Result};
use sidx_config::SourceConfig;
use sidx_source::{file_id, AllowList, FetchedSource, RuleFile, SourceFetcher};
use std::collections::{BTreeMap, BTreeSet};

/// Serves rule files from memory, keyed by source name. The source locator
/// in the config is ignored; the allow-list is applied as usual.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    sources: BTreeMap<String, Vec<(String, String)>>,
    failing: BTreeSet<String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `rel_path` with `contents` to source `name`.
    pub fn file(mut self, name: &str, rel_path: &str, contents: &str) -> Self {
        self.sources
            .entry(name.to_string())
            .or_default()
            .push((rel_path.to_string(), contents.to_string()));
        self
    }

    /// Make every fetch of `name` fail.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

#[async_trait::async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, name: &str, src: &SourceConfig) -> Result<FetchedSource> {
        if self.failing.contains(name) {
            bail!("source '{name}' unavailable");
        }
        let allow = AllowList::new(src.files.iter().cloned());
        let mut out = FetchedSource {
            name: name.to_string(),
            ..FetchedSource::default()
        };
        for (rel, contents) in self.sources.get(name).into_iter().flatten() {
            if allow.contains(rel) {
                out.files.push(RuleFile {
                    file_id: file_id(name, rel),
                    rel_path: rel.clone(),
                    contents: contents.clone(),
                });
            } else {
                out.skipped.push(rel.clone());
            }
        }
        let found: BTreeSet<&str> = out.files.iter().map(|f| f.rel_path.as_str()).collect();
        out.missing = allow
            .iter()
            .filter(|p| !found.contains(p))
            .map(str::to_string)
            .collect();
        Ok(out)
    }
}
