//! Profiling pipeline: CPU session around a parallel workload, then
//! point-in-time snapshots, each rendered to images.

mod export;
mod kind;
mod orchestrator;
mod pprof_format;
mod procfs;
mod report;
mod session;
mod snapshot;

pub use export::*;
pub use kind::*;
pub use orchestrator::*;
pub use pprof_format::*;
pub use procfs::*;
pub use report::*;
pub use session::*;
pub use snapshot::*;
