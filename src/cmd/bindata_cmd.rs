//! BinData conversion commands (`pariksha bindata ...`).

use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::{HarnessResult, decode_bindata, encode_uuid};

#[derive(Debug, Subcommand)]
pub enum BinDataCommand {
    /// Encode a hyphenated UUID as a BinData(0, '...') literal
    Encode {
        #[arg(value_name = "UUID")]
        uuid: String,
    },
    /// Decode a BinData(0, '...') literal back to a UUID
    Decode {
        #[arg(value_name = "BINDATA")]
        value: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinDataConversion {
    pub input: String,
    pub output: String,
}

pub fn bindata_command(command: &BinDataCommand) -> HarnessResult<BinDataConversion> {
    let (input, output) = match command {
        BinDataCommand::Encode { uuid } => (uuid, encode_uuid(uuid)?),
        BinDataCommand::Decode { value } => (value, decode_bindata(value)?),
    };
    Ok(BinDataConversion {
        input: input.clone(),
        output,
    })
}
