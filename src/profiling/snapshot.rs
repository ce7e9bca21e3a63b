//! Snapshot profiles: capture one kind to a transient artifact and export it.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::profiling::export::{Renderer, export_graph};
use crate::profiling::pprof_format::ProfileBuilder;
use crate::profiling::procfs::{ProcStatus, thread_names};
use crate::profiling::report::{WarningStage, Warnings};
use crate::profiling::session::last_contention_window;
use crate::{HarnessError, HarnessResult, ProfileKind};

/// Produces the raw bytes of a point-in-time profile.
pub trait SnapshotSource: Send + Sync {
    fn capture(&self, kind: ProfileKind) -> HarnessResult<Vec<u8>>;
}

/// Snapshots of this process built from `/proc/self`, encoded as pprof
/// protobuf.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSnapshots;

impl SnapshotSource for ProcessSnapshots {
    fn capture(&self, kind: ProfileKind) -> HarnessResult<Vec<u8>> {
        match kind {
            ProfileKind::Heap => {
                let st = ProcStatus::read()?;
                let mut b = ProfileBuilder::new()
                    .sample_type("resident_space", "bytes")
                    .sample_type("peak_resident_space", "bytes")
                    .sample_type("virtual_space", "bytes");
                b.sample(
                    "process",
                    vec![kib(st.vm_rss_kb), kib(st.vm_hwm_kb), kib(st.vm_size_kb)],
                );
                Ok(b.encode())
            }
            ProfileKind::Goroutine => {
                let names = thread_names()?;
                let mut b = ProfileBuilder::new().sample_type("threads", "count");
                for (name, count) in names {
                    b.sample(&name, vec![count as i64]);
                }
                Ok(b.encode())
            }
            ProfileKind::ThreadCreate => {
                let st = ProcStatus::read()?;
                let mut b = ProfileBuilder::new().sample_type("threads", "count");
                b.sample("process", vec![st.threads as i64]);
                Ok(b.encode())
            }
            ProfileKind::Block | ProfileKind::Mutex => {
                let window = last_contention_window().ok_or_else(|| {
                    HarnessError::Capture(format!(
                        "{kind} profile needs a completed CPU session; contention sampling was never enabled"
                    ))
                })?;
                let (sample_type, value) = if kind == ProfileKind::Block {
                    ("voluntary_switches", window.voluntary_switches)
                } else {
                    ("involuntary_switches", window.involuntary_switches)
                };
                let mut b = ProfileBuilder::new().sample_type(sample_type, "count");
                b.sample("process", vec![value as i64]);
                Ok(b.encode())
            }
        }
    }
}

fn kib(kb: u64) -> i64 {
    kb.saturating_mul(1024).try_into().unwrap_or(i64::MAX)
}

/// Captures `kind` into a transient artifact and renders it into `dir` once
/// per format. The artifact is removed when this returns, on every path.
/// Failures are recorded in `warnings`; the written images are returned.
pub fn write_profile_and_export(
    source: &dyn SnapshotSource,
    renderer: &dyn Renderer,
    kind: &str,
    dir: &Path,
    formats: &[String],
    warnings: &mut Warnings,
) -> Vec<PathBuf> {
    let mut written = Vec::new();
    if formats.is_empty() {
        tracing::info!("skipping {kind} profile: no output formats selected");
        return written;
    }
    let parsed = match kind.parse::<ProfileKind>() {
        Ok(k) => k,
        Err(err) => {
            warnings.push(WarningStage::Capture, Some(kind), None, err.to_string());
            return written;
        }
    };
    let mut artifact = match tempfile::Builder::new()
        .prefix(&format!("{kind}-"))
        .suffix(".prof")
        .tempfile()
    {
        Ok(f) => f,
        Err(err) => {
            warnings.push(
                WarningStage::Capture,
                Some(kind),
                None,
                format!("failed to create temp file for {kind} profile: {err}"),
            );
            return written;
        }
    };
    let bytes = match source.capture(parsed) {
        Ok(bytes) => bytes,
        Err(err) => {
            warnings.push(
                WarningStage::Capture,
                Some(kind),
                None,
                format!("failed to write {kind} profile: {err}"),
            );
            return written;
        }
    };
    if let Err(err) = artifact.write_all(&bytes).and_then(|_| artifact.flush()) {
        warnings.push(
            WarningStage::Capture,
            Some(kind),
            None,
            format!("failed to write {kind} profile: {err}"),
        );
        return written;
    }
    tracing::info!("{kind} profile written to temporary file");

    for format in formats {
        let dest = dir.join(format!("{kind}.{format}"));
        if export_graph(renderer, artifact.path(), &dest, format, kind, warnings) {
            written.push(dest);
        }
    }
    written
}
