//! Drives one profiling run for a test case.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use time::format_description::well_known::Rfc3339;

use crate::profiling::export::{CommandRenderer, Renderer, export_graph};
use crate::profiling::report::{ProfilingReport, ProfilingState, WarningStage, Warnings};
use crate::profiling::session::{CpuSampler, CpuSession, PprofSampler};
use crate::profiling::snapshot::{ProcessSnapshots, SnapshotSource, write_profile_and_export};
use crate::{ApiTestCase, Config, HarnessError, HarnessResult, Host, make_dir_if_not_exists};

/// Profiling pipeline bound to one configuration. The configuration is
/// owned, so it cannot change while a run is in flight.
#[derive(Clone)]
pub struct Profiler {
    config: Arc<Config>,
    sampler: Arc<dyn CpuSampler>,
    snapshots: Arc<dyn SnapshotSource>,
    renderer: Arc<dyn Renderer>,
}

impl Profiler {
    pub fn new(config: Config) -> Self {
        let renderer = CommandRenderer::from_config(&config.renderer);
        Self {
            config: Arc::new(config),
            sampler: Arc::new(PprofSampler::default()),
            snapshots: Arc::new(ProcessSnapshots),
            renderer: Arc::new(renderer),
        }
    }

    /// A profiler using [`Config::process_default`].
    pub fn from_process_default() -> Self {
        Self::new(Config::process_default().clone())
    }

    pub fn with_sampler(mut self, sampler: impl CpuSampler + 'static) -> Self {
        self.sampler = Arc::new(sampler);
        self
    }

    pub fn with_snapshots(mut self, snapshots: impl SnapshotSource + 'static) -> Self {
        self.snapshots = Arc::new(snapshots);
        self
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Profiles `case` under the host's parallel workload.
    ///
    /// Only CPU-session problems are returned as errors. Everything else is a
    /// warning in the report, and the run carries on.
    pub fn run(&self, host: &dyn Host, case: &ApiTestCase) -> HarnessResult<ProfilingReport> {
        let started = Instant::now();
        let started_at = time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let mut report = ProfilingReport {
            function_name: case.function_name.clone(),
            case_name: case.name.clone(),
            output_dir: None,
            outputs: Vec::new(),
            warnings: Vec::new(),
            final_state: ProfilingState::Idle,
            started_at,
            duration_ms: 0,
        };
        let formats = &self.config.output_formats;
        if formats.is_empty() {
            tracing::info!("profiling {:?} skipped: no output formats selected", case.name);
            report.final_state = ProfilingState::Done;
            return Ok(report);
        }

        let mut warnings = Warnings::default();
        let dir = case.profile_dir(&self.config.output_root);
        if let Err(err) = make_dir_if_not_exists(&dir) {
            warnings.push(
                WarningStage::Directory,
                None,
                None,
                format!("failed to create profile directory {}: {err}", dir.display()),
            );
        }
        report.output_dir = Some(dir.clone());
        report.final_state = ProfilingState::DirectoryPrepared;

        let cpu_artifact = tempfile::Builder::new()
            .prefix("cpu_profile_")
            .suffix(".prof")
            .tempfile()
            .map_err(|e| HarnessError::ProfileState(format!("failed to create temp CPU profile file: {e}")))?;
        let session = CpuSession::start(self.sampler.as_ref(), cpu_artifact.path())?;
        report.final_state = ProfilingState::CpuSessionActive;

        report.final_state = ProfilingState::WorkloadExecuting;
        let config = self.config.as_ref();
        host.run_parallel(&|it| {
            while it.next() {
                if let Err(err) = case.execute_handler(config) {
                    tracing::debug!("handler execution failed: {err}");
                }
            }
        });

        session.stop()?;
        report.final_state = ProfilingState::CpuSessionStopped;

        let mut outputs: Vec<PathBuf> = Vec::new();
        for format in formats {
            let dest = dir.join(format!("cpu.{format}"));
            if export_graph(
                self.renderer.as_ref(),
                cpu_artifact.path(),
                &dest,
                format,
                "cpu",
                &mut warnings,
            ) {
                outputs.push(dest);
            }
        }
        drop(cpu_artifact);
        report.final_state = ProfilingState::CpuExported;

        for kind in &self.config.profile_kinds {
            outputs.extend(write_profile_and_export(
                self.snapshots.as_ref(),
                self.renderer.as_ref(),
                kind,
                &dir,
                formats,
                &mut warnings,
            ));
        }
        report.final_state = ProfilingState::SnapshotsExported;

        if !warnings.is_empty() {
            tracing::warn!(
                "profiling {:?} finished with {} warning(s)",
                case.name,
                warnings.len()
            );
        }
        report.outputs = outputs;
        report.warnings = warnings.into_vec();
        report.final_state = ProfilingState::Done;
        report.duration_ms = started.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::session::{FixedSampler, TEST_SESSION_LOCK};
    use crate::{HarnessResult, OutputFormat, ProfileKind, StdHost};
    use http::{Method, StatusCode};
    use std::path::Path;
    use std::sync::PoisonError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pariksha-orch-{name}-{}", uuid::Uuid::new_v4()))
    }

    fn case(calls: Arc<AtomicUsize>) -> ApiTestCase {
        ApiTestCase::new("list users", Method::GET, "/users", move |ctx| {
            calls.fetch_add(1, Ordering::Relaxed);
            ctx.json(StatusCode::OK, &serde_json::json!({"response": {"code": 200}}));
        })
        .function_name("BenchmarkListUsers")
    }

    struct FakeSnapshots;

    impl SnapshotSource for FakeSnapshots {
        fn capture(&self, kind: ProfileKind) -> HarnessResult<Vec<u8>> {
            Ok(kind.as_str().as_bytes().to_vec())
        }
    }

    fn echo_renderer(_: &Path, format: OutputFormat) -> HarnessResult<Vec<u8>> {
        Ok(format.as_str().as_bytes().to_vec())
    }

    #[test]
    fn full_run_writes_cpu_and_snapshot_images() {
        let _serial = TEST_SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let root = temp_root("full");
        let calls = Arc::new(AtomicUsize::new(0));
        let config = Config::default()
            .output_root(&root)
            .output_formats(["png", "pdf"])
            .profile_kinds(["heap", "goroutine"]);
        let profiler = Profiler::new(config)
            .with_sampler(FixedSampler(b"cpu".to_vec()))
            .with_snapshots(FakeSnapshots)
            .with_renderer(echo_renderer);
        let host = StdHost::new("bench").with_iterations(64).with_parallelism(4);

        let report = profiler.run(&host, &case(Arc::clone(&calls))).expect("run");

        let dir = root.join("BenchmarkListUsers").join("list_users");
        assert_eq!(report.output_dir.as_deref(), Some(dir.as_path()));
        assert_eq!(report.final_state, ProfilingState::Done);
        assert!(report.is_complete(), "warnings: {:?}", report.warnings);
        assert_eq!(calls.load(Ordering::Relaxed), 64);
        for name in ["cpu.png", "cpu.pdf", "heap.png", "heap.pdf", "goroutine.png", "goroutine.pdf"] {
            assert!(dir.join(name).is_file(), "{name} missing");
        }
        assert_eq!(report.outputs.len(), 6);
    }

    #[test]
    fn empty_formats_touch_nothing() {
        let _serial = TEST_SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let root = temp_root("empty");
        let renders = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&renders);
        let profiler = Profiler::new(Config::default().output_root(&root).output_formats(Vec::<String>::new()))
            .with_sampler(FixedSampler(Vec::new()))
            .with_snapshots(FakeSnapshots)
            .with_renderer(move |_: &Path, _: OutputFormat| -> HarnessResult<Vec<u8>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            });
        let calls = Arc::new(AtomicUsize::new(0));
        let report = profiler
            .run(&StdHost::new("bench"), &case(Arc::clone(&calls)))
            .expect("run");
        assert_eq!(report.final_state, ProfilingState::Done);
        assert!(report.output_dir.is_none());
        assert!(report.outputs.is_empty());
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert!(!root.exists());
    }

    #[test]
    fn invalid_format_is_skipped_and_the_rest_continue() {
        let _serial = TEST_SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let root = temp_root("invalid");
        let config = Config::default()
            .output_root(&root)
            .output_formats(["svg", "png"])
            .profile_kinds(["heap"]);
        let profiler = Profiler::new(config)
            .with_sampler(FixedSampler(Vec::new()))
            .with_snapshots(FakeSnapshots)
            .with_renderer(echo_renderer);
        let report = profiler
            .run(&StdHost::new("bench"), &case(Arc::new(AtomicUsize::new(0))))
            .expect("run");
        let dir = root.join("BenchmarkListUsers").join("list_users");
        assert!(dir.join("cpu.png").is_file());
        assert!(dir.join("heap.png").is_file());
        assert!(!dir.join("cpu.svg").exists());
        assert!(!dir.join("heap.svg").exists());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().all(|w| w.stage == WarningStage::Format));
        assert!(!report.is_complete());
    }

    #[test]
    fn busy_cpu_slot_is_fatal() {
        let _serial = TEST_SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let root = temp_root("busy");
        let holder = tempfile::NamedTempFile::new().expect("temp");
        let active = CpuSession::start(&FixedSampler(Vec::new()), holder.path()).expect("start");
        let profiler = Profiler::new(Config::default().output_root(&root))
            .with_sampler(FixedSampler(Vec::new()))
            .with_snapshots(FakeSnapshots)
            .with_renderer(echo_renderer);
        let err = profiler
            .run(&StdHost::new("bench"), &case(Arc::new(AtomicUsize::new(0))))
            .expect_err("slot is taken");
        assert!(matches!(err, HarnessError::ProfileState(_)));
        active.stop().expect("stop");
    }
}
