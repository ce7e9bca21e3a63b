mod cli_logger;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pariksha::{
    BinDataCommand, Config, DEFAULT_CONFIG_FILE, OutputFormat, bindata_command, export_command,
    outputs_command,
};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::process::ExitCode;

use cli_logger::CliLogger;

#[derive(Debug, Parser)]
#[command(name = "pariksha", version, about = "HTTP handler test and profiling harness tools")]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a raw profile artifact to an image with the configured renderer
    Export {
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,
        #[arg(long, default_value = "png")]
        format: OutputFormat,
        #[arg(long)]
        out: PathBuf,
    },
    /// Convert between UUIDs and BinData literals
    Bindata {
        #[command(subcommand)]
        command: BinDataCommand,
    },
    /// List rendered profile images
    Outputs {
        /// Output tree to scan (defaults to the configured output root)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Glob patterns matched against paths relative to the root
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let logger = CliLogger::new(cli.json, cli.no_color);
    match run(&cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli, logger: &CliLogger) -> Result<()> {
    let config = Config::load_optional(&cli.config);
    match &cli.command {
        Command::Export {
            artifact,
            format,
            out,
        } => {
            let summary = export_command(&config, artifact, *format, out)?;
            logger.print_export(&summary)?;
            if !summary.written {
                anyhow::bail!("nothing was written to {}", out.display());
            }
        }
        Command::Bindata { command } => {
            logger.print_serialized(&bindata_command(command)?)?;
        }
        Command::Outputs { root, patterns } => {
            let listing = outputs_command(&config, root.as_deref(), patterns)?;
            logger.print_outputs(&listing)?;
        }
        Command::Config => logger.print_serialized(&config)?,
    }
    Ok(())
}
