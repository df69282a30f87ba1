//! Command handler modules for sidx-cli.
//!
//! Shared utilities used by multiple command paths live here.

pub mod sync;

use anyhow::{Context, Result};
use sidx_config::{report_unused_keys, ConfigScope, LoadedConfig, SyncConfig, UnusedKeyPolicy};
use sqlx::PgPool;
use tracing::warn;

/// Load layered config and run the unused-key guard for `scope`.
pub fn load_config(paths: &[String], scope: ConfigScope, strict: bool) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = sidx_config::load_layered_yaml(&path_refs)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(scope, &loaded.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        warn!(scope = %report.scope, pointer = %p, "unused config key");
    }
    Ok(loaded)
}

/// Connect using `database.url_env` from the given config, or the default
/// env var when no config is given. The config is the same file `sidx sync`
/// reads, so it is checked against the sync registry.
pub async fn connect_db(config_paths: &[String]) -> Result<PgPool> {
    if config_paths.is_empty() {
        return sidx_db::connect_from_env().await;
    }
    let loaded = load_config(config_paths, ConfigScope::Sync, false)?;
    let cfg: SyncConfig = serde_json::from_value(loaded.config_json)
        .context("config does not match the sync config shape")?;
    sidx_db::connect_from_env_var(&cfg.database.url_env).await
}
