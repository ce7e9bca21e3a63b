//! Small filesystem utilities.

use globset::{Glob, GlobSet, GlobSetBuilder};

use std::io::Write as _;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{HarnessError, HarnessResult};

/// Creates `path` and its parents. An existing directory is not an error.
pub fn make_dir_if_not_exists(path: &Path) -> HarnessResult<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Writes `bytes` to a temp file next to `dest` and renames it into place, so
/// readers never observe a partially written file. Missing parent
/// directories are created.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> HarnessResult<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    make_dir_if_not_exists(parent)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".pariksha-")
        .suffix(".part")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| HarnessError::Io(e.error))?;
    Ok(())
}

/// Rendered images under `root`, optionally filtered by glob patterns that
/// are matched against the path relative to `root`.
pub fn find_profile_outputs(root: &Path, patterns: &[String]) -> HarnessResult<Vec<PathBuf>> {
    let set = if patterns.is_empty() {
        None
    } else {
        Some(compile_globset(patterns)?)
    };
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            HarnessError::Io(e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg)))
        })?;
        if !entry.file_type().is_file() || !is_rendered_image(entry.path()) {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if set.as_ref().is_none_or(|s| s.is_match(rel)) {
            out.push(entry.path().to_path_buf());
        }
    }
    Ok(out)
}

fn is_rendered_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| crate::OutputFormat::parse(ext).is_some())
}

fn compile_globset(patterns: &[String]) -> HarnessResult<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        let g = Glob::new(p)
            .map_err(|e| HarnessError::InvalidArgument(format!("invalid glob {p:?}: {e}")))?;
        b.add(g);
    }
    b.build()
        .map_err(|e| HarnessError::InvalidArgument(format!("invalid globset: {e}")))
}
