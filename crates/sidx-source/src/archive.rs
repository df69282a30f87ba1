//! HTTP(S) sources: gzip-compressed tar archives.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, info};

use crate::{file_id, AllowList, FetchedSource, RuleFile};

/// Download `url` and read the allow-listed entries of the archive.
///
/// The body is buffered in memory before extraction; rule archives are a few
/// megabytes at most.
pub async fn fetch_http(
    name: &str,
    url: &str,
    allow: &AllowList,
    http: &reqwest::Client,
) -> Result<FetchedSource> {
    let resp = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("request failed source={name}"))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("http error source={} status={}", name, status.as_u16());
    }

    let body = resp
        .bytes()
        .await
        .with_context(|| format!("failed to read response body source={name}"))?;

    let name = name.to_string();
    let allow = allow.clone();
    tokio::task::spawn_blocking(move || read_tar_gz(&name, &body[..], &allow))
        .await
        .context("archive extraction task failed")?
}

/// Read the allow-listed regular entries of a `.tar.gz` stream.
pub fn read_tar_gz<R: Read>(name: &str, reader: R, allow: &AllowList) -> Result<FetchedSource> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut out = FetchedSource {
        name: name.to_string(),
        ..Default::default()
    };

    let entries = archive
        .entries()
        .with_context(|| format!("invalid archive source={name}"))?;
    for entry in entries {
        let mut entry = entry.with_context(|| format!("corrupt archive entry source={name}"))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .with_context(|| format!("invalid entry path source={name}"))?
            .to_string_lossy()
            .replace('\\', "/");

        if !allow.contains(&rel) {
            debug!(source = %name, file = %rel, "skipping");
            out.skipped.push(rel);
            continue;
        }

        info!(source = %name, file = %rel, "parsing");
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read entry {rel} source={name}"))?;
        out.files.push(RuleFile {
            file_id: file_id(name, &rel),
            rel_path: rel,
            contents: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    Ok(out)
}
