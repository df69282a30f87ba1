//! sidx-source
//!
//! Rule retrieval. Reads allow-listed rule files from a local directory tree
//! or from a gzip-compressed tar archive served over HTTP(S), and decodes
//! their lines into candidates for reconciliation.
//!
//! This crate does **not** touch the database and makes no ordering promise
//! across files or archive entries.

pub mod archive;
pub mod local;
pub mod rule;

use anyhow::{Context, Result};
use sidx_config::{SourceConfig, SourceLocator};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

pub use rule::{decode_line, parse_rule, Rule, RuleParseError};

// ---------------------------------------------------------------------------
// Fetched files
// ---------------------------------------------------------------------------

/// One allow-listed rule file read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFile {
    /// `<source name>:<relative path>`
    pub file_id: String,
    /// Path relative to the source root (or archive entry name), `/`-separated.
    pub rel_path: String,
    pub contents: String,
}

/// Everything read from one source.
#[derive(Debug, Clone, Default)]
pub struct FetchedSource {
    pub name: String,
    /// Allow-listed files, in the order they were encountered.
    pub files: Vec<RuleFile>,
    /// Regular files present in the source but not allow-listed.
    pub skipped: Vec<String>,
    /// Allow-listed files that the source did not contain.
    pub missing: Vec<String>,
}

impl FetchedSource {
    fn finish(mut self, allow: &AllowList) -> Self {
        let found: BTreeSet<&str> = self.files.iter().map(|f| f.rel_path.as_str()).collect();
        self.missing = allow
            .iter()
            .filter(|p| !found.contains(p))
            .map(|p| p.to_string())
            .collect();
        for m in &self.missing {
            warn!(source = %self.name, file = %m, "allow-listed file not found in source");
        }
        self
    }
}

pub fn file_id(source_name: &str, rel_path: &str) -> String {
    format!("{source_name}:{rel_path}")
}

/// Set of file identifiers to ingest from one source.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    paths: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.paths.contains(rel_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Source retrieval seam used by the sync driver.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, name: &str, src: &SourceConfig) -> Result<FetchedSource>;
}

/// Fetches local directories from disk and HTTP(S) archives with `reqwest`.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    http: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout_secs)?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build http client")
}

#[async_trait::async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(&self, name: &str, src: &SourceConfig) -> Result<FetchedSource> {
        let locator = src.locator()?;
        let allow = AllowList::new(src.files.iter().cloned());
        info!(source = %name, kind = locator.kind(), locator = %src.source, "fetching source");

        let fetched = match locator {
            SourceLocator::Local(root) => {
                let name = name.to_string();
                let allow_c = allow.clone();
                tokio::task::spawn_blocking(move || local::read_local(&name, &root, &allow_c))
                    .await
                    .context("local source task failed")??
            }
            SourceLocator::Http(url) => archive::fetch_http(name, &url, &allow, &self.http).await?,
        };

        info!(
            source = %name,
            files = fetched.files.len(),
            skipped = fetched.skipped.len(),
            "source fetched"
        );
        Ok(fetched.finish(&allow))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A rule line ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub sid: u64,
    pub rev: i32,
    pub file_id: String,
    /// 1-based line number within the file.
    pub line_no: usize,
    /// Raw rule line, trimmed.
    pub line: String,
}

#[derive(Debug, Clone, Default)]
pub struct DecodedFile {
    pub candidates: Vec<Candidate>,
    /// Blank lines, comments and non-alert rules.
    pub ignored_lines: usize,
    /// Lines that failed to decode; logged and skipped.
    pub invalid_lines: usize,
}

/// Decode every line of a rule file. Invalid lines are logged and skipped;
/// they never abort the file.
pub fn decode_file(file: &RuleFile) -> DecodedFile {
    let mut out = DecodedFile::default();
    for (i, raw) in file.contents.lines().enumerate() {
        match decode_line(raw) {
            Ok(Some(rule)) => out.candidates.push(Candidate {
                sid: rule.sid,
                rev: rule.rev,
                file_id: file.file_id.clone(),
                line_no: i + 1,
                line: raw.trim().to_string(),
            }),
            Ok(None) => out.ignored_lines += 1,
            Err(e) => {
                out.invalid_lines += 1;
                warn!(file = %file.file_id, line_no = i + 1, error = %e, rule = %raw.trim(), "invalid rule line skipped");
            }
        }
    }
    out
}
