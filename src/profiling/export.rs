//! Graph export: raw profile artifact -> rendered image.

use std::path::Path;
use std::process::Command;

use crate::profiling::report::{WarningStage, Warnings};
use crate::{HarnessError, HarnessResult, OutputFormat, RendererConfig, write_atomic};

/// Turns a raw profile artifact into image bytes.
pub trait Renderer: Send + Sync {
    fn render(&self, artifact: &Path, format: OutputFormat) -> HarnessResult<Vec<u8>>;
}

impl<F> Renderer for F
where
    F: Fn(&Path, OutputFormat) -> HarnessResult<Vec<u8>> + Send + Sync,
{
    fn render(&self, artifact: &Path, format: OutputFormat) -> HarnessResult<Vec<u8>> {
        self(artifact, format)
    }
}

/// Runs `<program> <args..> -<format> <artifact>` and takes its stdout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default())
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, artifact: &Path, format: OutputFormat) -> HarnessResult<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(format.flag())
            .arg(artifact)
            .output()
            .map_err(|e| HarnessError::Render(format!("failed to run {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarnessError::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// Renders `artifact` as `format` into `dest`. Never fails: problems are
/// recorded in `warnings` and nothing is written. Returns whether `dest` was
/// written.
pub fn export_graph(
    renderer: &dyn Renderer,
    artifact: &Path,
    dest: &Path,
    format: &str,
    profile: &str,
    warnings: &mut Warnings,
) -> bool {
    let Some(parsed) = OutputFormat::parse(format) else {
        warnings.push(
            WarningStage::Format,
            Some(profile),
            Some(format),
            format!("invalid profiling output format: {format}. Only 'png' and 'pdf' are supported."),
        );
        return false;
    };
    let bytes = match renderer.render(artifact, parsed) {
        Ok(bytes) => bytes,
        Err(err) => {
            warnings.push(
                WarningStage::Render,
                Some(profile),
                Some(format),
                format!("failed to generate {format} for {}: {err}", artifact.display()),
            );
            return false;
        }
    };
    if let Err(err) = write_atomic(dest, &bytes) {
        warnings.push(
            WarningStage::Write,
            Some(profile),
            Some(format),
            format!("failed to write {format} to {}: {err}", dest.display()),
        );
        return false;
    }
    tracing::info!("{} saved to {}", format.to_uppercase(), dest.display());
    true
}
