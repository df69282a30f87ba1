use anyhow::{bail, Context, Result};
use sidx_config::{ConfigScope, SyncConfig};
use sidx_source::DefaultFetcher;
use sidx_sync::{PgRuleStore, SyncOptions, SyncReport, Synchronizer};
use tracing::info;

use super::load_config;

pub struct SyncArgs {
    pub config_paths: Vec<String>,
    pub dry_run: bool,
    pub strict_config: bool,
    pub json: bool,
}

pub async fn run(args: SyncArgs) -> Result<()> {
    let loaded = load_config(&args.config_paths, ConfigScope::Sync, args.strict_config)?;
    let cfg = SyncConfig::from_loaded(&loaded)?;
    if cfg.sources.is_empty() {
        bail!("CONFIG_NO_SOURCES: at least one entry under sources is required");
    }
    info!(config_hash = %loaded.config_hash, sources = cfg.sources.len(), "config loaded");

    let url = cfg.database_url()?;
    let pool = sidx_db::connect(&url).await?;
    let fetcher = DefaultFetcher::new(cfg.fetch.timeout_secs)?;

    let sync = Synchronizer::new(PgRuleStore::new(pool), fetcher).with_options(SyncOptions {
        dry_run: args.dry_run,
    });
    let report = sync.run(&cfg).await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize sync report")?
        );
    } else {
        print_report(&report, &loaded.config_hash);
    }

    if !report.is_clean() {
        bail!(
            "SYNC_PARTIAL_FAILURE run_id={} failures={}",
            report.run_id,
            report.failures
        );
    }
    Ok(())
}

fn print_report(r: &SyncReport, config_hash: &str) {
    println!("run_id={}", r.run_id);
    println!("config_hash={}", config_hash);
    println!("dry_run={}", r.dry_run);
    println!("started_at_utc={}", r.started_at.to_rfc3339());
    println!("finished_at_utc={}", r.finished_at.to_rfc3339());
    println!("baseline={}", r.baseline);
    println!("sources={} files={}", r.sources, r.files);
    println!("new={}", r.new);
    println!("updated={}", r.updated);
    println!("reactivated={}", r.reactivated);
    println!("unchanged={}", r.unchanged);
    println!("removed={}", r.removed);
    println!("duplicates={}", r.duplicates);
    println!("skipped_lines={}", r.skipped_lines);
    println!("failures={}", r.failures);
}
