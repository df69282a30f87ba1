use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn sidx() -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("sidx")?;
    cmd.env_remove("SIDX_DATABASE_URL");
    Ok(cmd)
}

#[test]
fn cli_sync_rejects_empty_allow_list() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("sync.yaml");
    fs::write(&cfg, "sources:\n  et:\n    source: /srv/rules\n    files: []\n")?;

    sidx()?
        .args(["sync", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_INVALID_SOURCE"));
    Ok(())
}

#[test]
fn cli_sync_strict_config_rejects_typo() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("sync.yaml");
    fs::write(
        &cfg,
        "sources:\n  et:\n    source: /srv/rules\n    files: [a.rules]\n    fils: [b.rules]\n",
    )?;

    sidx()?
        .args(["sync", "--strict-config", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"))
        .stderr(predicate::str::contains("/sources/et/fils/0"));
    Ok(())
}

#[test]
fn cli_sync_requires_database_url() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("sync.yaml");
    fs::write(&cfg, "sources:\n  et:\n    source: /srv/rules\n    files: [a.rules]\n")?;

    sidx()?
        .args(["sync", "--dry-run", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing env var SIDX_DATABASE_URL"));
    Ok(())
}

#[test]
fn cli_sync_requires_config() -> anyhow::Result<()> {
    sidx()?.arg("sync").assert().failure();
    Ok(())
}
