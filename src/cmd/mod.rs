mod bindata_cmd;
mod profile_cmd;

pub use bindata_cmd::*;
pub use profile_cmd::*;
