//! Local directory sources.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{file_id, AllowList, FetchedSource, RuleFile};

/// Walk `root` recursively and read every allow-listed regular file.
///
/// Symlinks are not followed. Entries are visited in lexical order so repeated
/// runs over the same tree produce the same candidate order.
pub fn read_local(name: &str, root: &Path, allow: &AllowList) -> Result<FetchedSource> {
    let mut found: Vec<(String, PathBuf)> = Vec::new();
    walk(root, root, &mut found)
        .with_context(|| format!("error walking the path {}", root.display()))?;

    let mut out = FetchedSource {
        name: name.to_string(),
        ..Default::default()
    };

    for (rel, path) in found {
        if !allow.contains(&rel) {
            debug!(source = %name, file = %rel, "skipping");
            out.skipped.push(rel);
            continue;
        }

        info!(source = %name, file = %rel, "parsing");
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        out.files.push(RuleFile {
            file_id: file_id(name, &rel),
            rel_path: rel,
            contents: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    Ok(out)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list directory {}", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let ft = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", path.display()))?;
        if ft.is_dir() {
            walk(root, &path, out)?;
        } else if ft.is_file() {
            out.push((relative_id(root, &path)?, path));
        }
    }
    Ok(())
}

/// `/`-separated path of `path` relative to `root`.
fn relative_id(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
