//! The host test/benchmark framework the harness runs inside.
//!
//! The harness never owns iteration control, parallelism or pass/fail state.
//! It calls a [`Host`] for all of those. [`StdHost`] is a plain std-thread
//! implementation usable from `#[test]` functions and the CLI.

use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{HarnessError, HarnessResult};

pub trait Host: Sync {
    fn name(&self) -> &str;

    /// Runs `body` as a named sub-test / sub-benchmark.
    fn group(&self, name: &str, body: &mut dyn FnMut(&dyn Host));

    /// Iteration budget for the current benchmark.
    fn iterations(&self) -> u64;

    /// Fans `body` out across the host's workers. Every worker pulls
    /// iterations from the shared budget until it is exhausted.
    fn run_parallel(&self, body: &(dyn Fn(&mut Iterations<'_>) + Sync));

    fn log(&self, message: &str);

    /// Reports a failure and stops the current test.
    fn fail_now(&self, message: &str) -> !;
}

pub trait HostExt: Host {
    fn require(&self, condition: bool, message: &str) {
        if !condition {
            self.fail_now(message);
        }
    }

    fn require_eq<T: PartialEq + Debug>(&self, expected: T, actual: T, message: &str) {
        if expected != actual {
            self.fail_now(&format!(
                "{message}: expected {expected:?}, actual {actual:?}"
            ));
        }
    }

    fn require_ok<T>(&self, result: HarnessResult<T>, message: &str) -> T {
        match result {
            Ok(v) => v,
            Err(err) => self.fail_now(&format!("{message}: {err}")),
        }
    }
}

impl<H: Host + ?Sized> HostExt for H {}

/// Per-worker cursor over a shared iteration budget.
pub struct Iterations<'a> {
    remaining: &'a AtomicU64,
    completed: u64,
}

impl<'a> Iterations<'a> {
    pub fn new(remaining: &'a AtomicU64) -> Self {
        Self {
            remaining,
            completed: 0,
        }
    }

    /// Claims one iteration. Returns `false` once the budget is spent.
    pub fn next(&mut self) -> bool {
        let claimed = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if claimed {
            self.completed = self.completed.saturating_add(1);
        }
        claimed
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub name: String,
    pub message: String,
}

/// A host backed by std threads. Failures inside [`Host::group`] are
/// recorded and the next group still runs; [`StdHost::finish`] turns them
/// into an error.
#[derive(Debug, Clone)]
pub struct StdHost {
    name: String,
    iterations: u64,
    parallelism: usize,
    failures: Arc<Mutex<Vec<GroupFailure>>>,
}

impl StdHost {
    pub fn new(name: impl Into<String>) -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            name: name.into(),
            iterations: 1,
            parallelism,
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_iterations(mut self, n: u64) -> Self {
        self.iterations = n;
        self
    }

    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    pub fn failures(&self) -> Vec<GroupFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn finish(&self) -> HarnessResult<()> {
        let failures = self.failures();
        if failures.is_empty() {
            return Ok(());
        }
        let joined = failures
            .iter()
            .map(|f| format!("{}: {}", f.name, f.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(HarnessError::Assertion(format!(
            "{} of the groups under {} failed: {joined}",
            failures.len(),
            self.name
        )))
    }

    fn child(&self, name: &str) -> Self {
        Self {
            name: format!("{}/{name}", self.name),
            iterations: self.iterations,
            parallelism: self.parallelism,
            failures: Arc::clone(&self.failures),
        }
    }
}

impl Host for StdHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn group(&self, name: &str, body: &mut dyn FnMut(&dyn Host)) {
        let child = self.child(name);
        tracing::debug!("running {}", child.name);
        let outcome = catch_unwind(AssertUnwindSafe(|| body(&child)));
        if let Err(payload) = outcome {
            let message = payload
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_else(|| "panicked".to_string());
            tracing::error!("{} failed: {message}", child.name);
            self.failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(GroupFailure {
                    name: child.name,
                    message,
                });
        }
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }

    fn run_parallel(&self, body: &(dyn Fn(&mut Iterations<'_>) + Sync)) {
        let remaining = AtomicU64::new(self.iterations);
        std::thread::scope(|scope| {
            for _ in 0..self.parallelism {
                scope.spawn(|| {
                    let mut it = Iterations::new(&remaining);
                    body(&mut it);
                });
            }
        });
    }

    fn log(&self, message: &str) {
        tracing::info!("{}: {message}", self.name);
    }

    fn fail_now(&self, message: &str) -> ! {
        panic!("{message}");
    }
}
