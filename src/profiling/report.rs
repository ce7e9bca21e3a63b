//! Outcome of one profiling run.

use serde::{Deserialize, Serialize};

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilingState {
    Idle,
    DirectoryPrepared,
    CpuSessionActive,
    WorkloadExecuting,
    CpuSessionStopped,
    CpuExported,
    SnapshotsExported,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStage {
    Directory,
    Capture,
    Format,
    Render,
    Write,
}

/// A degraded step: logged, skipped, and the run went on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileWarning {
    pub stage: WarningStage,
    /// `cpu` or a snapshot kind name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub message: String,
}

/// Collects warnings and logs each one as it arrives.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<ProfileWarning>,
}

impl Warnings {
    pub fn push(
        &mut self,
        stage: WarningStage,
        profile: Option<&str>,
        format: Option<&str>,
        message: impl Into<String>,
    ) {
        let warning = ProfileWarning {
            stage,
            profile: profile.map(str::to_string),
            format: format.map(str::to_string),
            message: message.into(),
        };
        tracing::warn!(
            stage = ?warning.stage,
            profile = warning.profile.as_deref().unwrap_or("-"),
            format = warning.format.as_deref().unwrap_or("-"),
            "{}",
            warning.message
        );
        self.items.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<ProfileWarning> {
        self.items
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilingReport {
    pub function_name: String,
    pub case_name: String,
    /// `None` when profiling was disabled by an empty format list.
    pub output_dir: Option<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<ProfileWarning>,
    pub final_state: ProfilingState,
    pub started_at: String,
    pub duration_ms: u64,
}

impl ProfilingReport {
    /// True when every configured profile rendered in every format.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}
