//! Typed view of the synchronization config.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::LoadedConfig;

pub const DEFAULT_DATABASE_URL_ENV: &str = "SIDX_DATABASE_URL";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Named rule sources, iterated in name order.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Name of the environment variable holding the Postgres URL.
    #[serde(default = "default_url_env")]
    pub url_env: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
        }
    }
}

fn default_url_env() -> String {
    DEFAULT_DATABASE_URL_ENV.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

/// One named source: where to read from and which files to ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: String,
    /// Allow-list of file identifiers (paths relative to the source root or
    /// archive entry names). Anything else is skipped.
    #[serde(default)]
    pub files: Vec<String>,
}

impl SourceConfig {
    pub fn locator(&self) -> Result<SourceLocator> {
        SourceLocator::parse(&self.source)
    }
}

/// Where a source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Absolute local directory.
    Local(PathBuf),
    /// `http://` or `https://` URL of a gzip-compressed tar archive.
    Http(String),
}

impl SourceLocator {
    pub fn parse(s: &str) -> Result<Self> {
        let t = s.trim();
        if t.starts_with("https://") || t.starts_with("http://") {
            return Ok(SourceLocator::Http(t.to_string()));
        }
        if t.starts_with('/') {
            return Ok(SourceLocator::Local(PathBuf::from(t)));
        }
        bail!(
            "CONFIG_INVALID_SOURCE locator='{}': expected an absolute path or an http(s) URL",
            t
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceLocator::Local(_) => "local",
            SourceLocator::Http(_) => "http",
        }
    }
}

impl SyncConfig {
    /// Deserialize and validate the typed view of a loaded config.
    ///
    /// Every source must have a valid locator and a non-empty allow-list: a
    /// source that ingests nothing would report its whole baseline as removed.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: SyncConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the sync config shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url_env.trim().is_empty() {
            bail!("CONFIG_INVALID_DATABASE: database.url_env must not be empty");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("CONFIG_INVALID_FETCH: fetch.timeout_secs must be > 0");
        }
        for (name, src) in &self.sources {
            src.locator()
                .with_context(|| format!("invalid source '{name}'"))?;
            if src.files.is_empty() {
                bail!(
                    "CONFIG_INVALID_SOURCE source='{}': files allow-list is empty",
                    name
                );
            }
        }
        Ok(())
    }

    /// Read the database URL from the configured environment variable.
    pub fn database_url(&self) -> Result<String> {
        let var = &self.database.url_env;
        std::env::var(var).with_context(|| format!("missing env var {var}"))
    }
}
