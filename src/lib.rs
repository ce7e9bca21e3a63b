//! Pariksha: table-driven test, benchmark and profiling harness for HTTP
//! handlers.

mod bindata;
mod case;
mod cmd;
mod config;
mod context;
mod host;
mod platform;
mod profiling;
mod response;
mod runner;

pub use bindata::*;
pub use case::*;
pub use cmd::*;
pub use config::*;
pub use context::*;
pub use host::*;
pub use platform::*;
pub use profiling::*;
pub use response::*;
pub use runner::*;
