//! Profile artifact commands (`pariksha export`, `pariksha outputs`).

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{
    CommandRenderer, Config, HarnessError, HarnessResult, OutputFormat, ProfileWarning, Renderer,
    Warnings, export_graph, find_profile_outputs,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub artifact: PathBuf,
    pub format: OutputFormat,
    pub out: PathBuf,
    pub written: bool,
    #[serde(default)]
    pub warnings: Vec<ProfileWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputsListing {
    pub root: PathBuf,
    pub total: usize,
    pub files: Vec<PathBuf>,
}

/// Renders an existing raw profile with the configured renderer.
pub fn export_command(
    config: &Config,
    artifact: &Path,
    format: OutputFormat,
    out: &Path,
) -> HarnessResult<ExportSummary> {
    let renderer = CommandRenderer::from_config(&config.renderer);
    export_with(&renderer, artifact, format, out)
}

fn export_with(
    renderer: &dyn Renderer,
    artifact: &Path,
    format: OutputFormat,
    out: &Path,
) -> HarnessResult<ExportSummary> {
    if !artifact.is_file() {
        return Err(HarnessError::InvalidArgument(format!(
            "profile artifact not found: {}",
            artifact.display()
        )));
    }
    let profile = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("profile")
        .to_string();
    let mut warnings = Warnings::default();
    let written = export_graph(renderer, artifact, out, format.as_str(), &profile, &mut warnings);
    Ok(ExportSummary {
        artifact: artifact.to_path_buf(),
        format,
        out: out.to_path_buf(),
        written,
        warnings: warnings.into_vec(),
    })
}

/// Lists rendered images under `root` (default: the configured output root).
pub fn outputs_command(
    config: &Config,
    root: Option<&Path>,
    patterns: &[String],
) -> HarnessResult<OutputsListing> {
    let root = root.unwrap_or(&config.output_root).to_path_buf();
    let files = find_profile_outputs(&root, patterns)?;
    Ok(OutputsListing {
        total: files.len(),
        root,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pariksha-cmd-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn export_renders_into_out() {
        let dir = temp_dir("export");
        let artifact = dir.join("heap.prof");
        std::fs::write(&artifact, b"raw").expect("write artifact");
        let renderer = |a: &Path, f: OutputFormat| -> HarnessResult<Vec<u8>> {
            let raw = std::fs::read(a)?;
            Ok([raw.as_slice(), b"-", f.as_str().as_bytes()].concat())
        };
        let out = dir.join("rendered").join("heap.png");
        let summary = export_with(&renderer, &artifact, OutputFormat::Png, &out).expect("export");
        assert!(summary.written);
        assert!(summary.warnings.is_empty());
        assert_eq!(std::fs::read(&out).expect("read"), b"raw-png");
    }

    #[test]
    fn export_reports_render_failure_as_warning() {
        let dir = temp_dir("export-fail");
        let artifact = dir.join("cpu.prof");
        std::fs::write(&artifact, b"raw").expect("write artifact");
        let renderer = |_: &Path, _: OutputFormat| -> HarnessResult<Vec<u8>> {
            Err(HarnessError::Render("tool missing".to_string()))
        };
        let summary =
            export_with(&renderer, &artifact, OutputFormat::Pdf, &dir.join("cpu.pdf")).expect("export");
        assert!(!summary.written);
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].profile.as_deref(), Some("cpu"));
    }

    #[test]
    fn export_rejects_missing_artifact() {
        let dir = temp_dir("missing");
        let err = export_command(
            &Config::default(),
            &dir.join("nope.prof"),
            OutputFormat::Png,
            &dir.join("nope.png"),
        )
        .expect_err("missing artifact");
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }

    #[test]
    fn outputs_defaults_to_configured_root() {
        let root = temp_dir("outputs");
        let case_dir = root.join("BenchmarkX").join("case_a");
        std::fs::create_dir_all(&case_dir).expect("mkdir");
        std::fs::write(case_dir.join("cpu.png"), b"x").expect("png");
        std::fs::write(case_dir.join("notes.txt"), b"x").expect("txt");
        let config = Config::default().output_root(&root);
        let listing = outputs_command(&config, None, &[]).expect("list");
        assert_eq!(listing.total, 1);
        assert_eq!(listing.files, vec![case_dir.join("cpu.png")]);
    }
}
