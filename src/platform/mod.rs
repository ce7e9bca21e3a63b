mod error;
mod fsutil;

pub use error::*;
pub use fsutil::*;
