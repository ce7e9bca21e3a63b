//! Continuous CPU sampling around a workload.
//!
//! Only one [`CpuSession`] can be active per process. While it is active the
//! process-wide contention sampling window is open; the `block` and `mutex`
//! snapshot profiles report what was counted inside the last closed window.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use pprof::protos::Message as _;

use crate::profiling::procfs::ProcStatus;
use crate::{HarnessError, HarnessResult};

static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);
static CONTENTION: Mutex<ContentionSampling> = Mutex::new(ContentionSampling {
    baseline: None,
    window: None,
});

pub const DEFAULT_SAMPLE_HZ: i32 = 100;

/// Context-switch counts accumulated inside one CPU session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentionWindow {
    pub voluntary_switches: u64,
    pub involuntary_switches: u64,
}

struct ContentionSampling {
    baseline: Option<ContentionWindow>,
    window: Option<ContentionWindow>,
}

fn read_switches() -> Option<ContentionWindow> {
    ProcStatus::read().ok().map(|st| ContentionWindow {
        voluntary_switches: st.voluntary_ctxt_switches,
        involuntary_switches: st.nonvoluntary_ctxt_switches,
    })
}

fn open_contention_window() {
    let mut state = CONTENTION.lock().unwrap_or_else(PoisonError::into_inner);
    state.baseline = read_switches();
    state.window = None;
}

fn close_contention_window() {
    let mut state = CONTENTION.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(base) = state.baseline.take() else {
        return;
    };
    state.window = read_switches().map(|now| ContentionWindow {
        voluntary_switches: now.voluntary_switches.saturating_sub(base.voluntary_switches),
        involuntary_switches: now
            .involuntary_switches
            .saturating_sub(base.involuntary_switches),
    });
}

/// Counts from the most recently stopped CPU session, if any.
pub fn last_contention_window() -> Option<ContentionWindow> {
    CONTENTION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .window
}

/// Starts continuous CPU sampling.
pub trait CpuSampler: Send + Sync {
    fn begin(&self) -> HarnessResult<Box<dyn CpuCapture>>;
}

/// A running CPU capture. `end` stops sampling and returns the encoded
/// profile.
pub trait CpuCapture {
    fn end(self: Box<Self>) -> HarnessResult<Vec<u8>>;
}

/// Signal-based sampler from the `pprof` crate, encoded as protobuf.
#[derive(Debug, Clone)]
pub struct PprofSampler {
    frequency: i32,
}

impl PprofSampler {
    pub fn new(frequency: i32) -> Self {
        Self { frequency }
    }
}

impl Default for PprofSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_HZ)
    }
}

impl CpuSampler for PprofSampler {
    fn begin(&self) -> HarnessResult<Box<dyn CpuCapture>> {
        let builder = pprof::ProfilerGuardBuilder::default().frequency(self.frequency);
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        let builder = builder.blocklist(&["libc", "libgcc", "pthread", "vdso"]);
        let guard = builder
            .build()
            .map_err(|e| HarnessError::ProfileState(format!("failed to start CPU profiler: {e}")))?;
        Ok(Box::new(PprofCapture { guard }))
    }
}

struct PprofCapture {
    guard: pprof::ProfilerGuard<'static>,
}

impl CpuCapture for PprofCapture {
    fn end(self: Box<Self>) -> HarnessResult<Vec<u8>> {
        let report = self
            .guard
            .report()
            .build()
            .map_err(|e| HarnessError::ProfileState(format!("failed to build CPU report: {e}")))?;
        let profile = report
            .pprof()
            .map_err(|e| HarnessError::ProfileState(format!("failed to encode CPU profile: {e}")))?;
        Ok(profile.encode_to_vec())
    }
}

/// An active CPU profile writing to `artifact`. Stop it with
/// [`CpuSession::stop`]; dropping it unstopped discards the samples and
/// frees the process-wide slot.
pub struct CpuSession {
    capture: Option<Box<dyn CpuCapture>>,
    artifact: PathBuf,
}

impl CpuSession {
    pub fn start(sampler: &dyn CpuSampler, artifact: &Path) -> HarnessResult<Self> {
        if SESSION_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HarnessError::ProfileState(
                "a CPU profile session is already active".to_string(),
            ));
        }
        let capture = match sampler.begin() {
            Ok(c) => c,
            Err(err) => {
                SESSION_ACTIVE.store(false, Ordering::Release);
                return Err(err);
            }
        };
        open_contention_window();
        tracing::debug!("CPU profiling started, artifact {}", artifact.display());
        Ok(Self {
            capture: Some(capture),
            artifact: artifact.to_path_buf(),
        })
    }

    pub fn is_active() -> bool {
        SESSION_ACTIVE.load(Ordering::Acquire)
    }

    /// Stops sampling and writes the profile to the artifact path.
    /// The process-wide slot stays held until the sampler has shut down.
    pub fn stop(mut self) -> HarnessResult<()> {
        let capture = self.capture.take();
        close_contention_window();
        let Some(capture) = capture else {
            return Err(HarnessError::ProfileState("CPU session already stopped".to_string()));
        };
        let ended = capture.end();
        SESSION_ACTIVE.store(false, Ordering::Release);
        let bytes = ended?;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&self.artifact)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        tracing::debug!("CPU profile written, {} bytes", bytes.len());
        Ok(())
    }
}

impl Drop for CpuSession {
    fn drop(&mut self) {
        if let Some(capture) = self.capture.take() {
            drop(capture);
            close_contention_window();
            SESSION_ACTIVE.store(false, Ordering::Release);
            tracing::warn!("CPU session dropped without stop; samples discarded");
        }
    }
}

/// Serializes tests that open CPU sessions; the slot is process-wide.
#[cfg(test)]
pub(crate) static TEST_SESSION_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
pub(crate) struct FixedSampler(pub Vec<u8>);

#[cfg(test)]
impl CpuSampler for FixedSampler {
    fn begin(&self) -> HarnessResult<Box<dyn CpuCapture>> {
        Ok(Box::new(FixedCapture(self.0.clone())))
    }
}

#[cfg(test)]
struct FixedCapture(Vec<u8>);

#[cfg(test)]
impl CpuCapture for FixedCapture {
    fn end(self: Box<Self>) -> HarnessResult<Vec<u8>> {
        Ok(self.0)
    }
}
