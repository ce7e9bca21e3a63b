//! `pariksha.toml` config loading and the process-wide default.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::{HarnessError, HarnessResult};

pub const DEFAULT_CONFIG_FILE: &str = "pariksha.toml";

static PROCESS_DEFAULT: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Snapshot profile kinds captured after the CPU profile.
    #[serde(default = "default_profile_kinds")]
    pub profile_kinds: Vec<String>,

    /// Image formats rendered for every profile. Empty disables profiling.
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,

    /// Log raw response bodies in assertion mode.
    #[serde(default)]
    pub log_response: bool,

    /// Root of the `<function>/<case>/` output tree.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    #[serde(default)]
    pub renderer: RendererConfig,

    /// Headers applied to every request before the case's own headers.
    #[serde(default = "default_common_headers")]
    pub common_headers: BTreeMap<String, String>,

    /// Context values injected into every request before the case's own keys.
    #[serde(default)]
    pub common_context: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            args: vec!["tool".to_string(), "pprof".to_string()],
        }
    }
}

fn default_profile_kinds() -> Vec<String> {
    ["heap", "goroutine", "block", "mutex", "threadcreate"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_output_formats() -> Vec<String> {
    vec!["png".to_string()]
}

fn default_output_root() -> PathBuf {
    PathBuf::from("profiles")
}

fn default_common_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_kinds: default_profile_kinds(),
            output_formats: default_output_formats(),
            log_response: false,
            output_root: default_output_root(),
            renderer: RendererConfig::default(),
            common_headers: default_common_headers(),
            common_context: serde_json::Map::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&s)?)
    }

    /// Like [`Config::load`], but a missing file yields defaults and an
    /// unreadable or malformed one yields defaults plus a warning.
    pub fn load_optional(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(HarnessError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(err) => {
                tracing::warn!("failed to load config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Installs the fallback configuration used by callers that do not pass
    /// one explicitly. Can only happen once, before the first read.
    pub fn install_default(config: Config) -> Result<(), Config> {
        PROCESS_DEFAULT.set(config)
    }

    /// The installed fallback, or `Config::default()` if none was installed.
    pub fn process_default() -> &'static Config {
        PROCESS_DEFAULT.get_or_init(Config::default)
    }

    pub fn profile_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profile_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn output_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn log_response(mut self, enabled: bool) -> Self {
        self.log_response = enabled;
        self
    }

    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn renderer(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.renderer = RendererConfig {
            program: program.into(),
            args,
        };
        self
    }

    pub fn common_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.common_headers.insert(key.into(), value.into());
        self
    }

    pub fn common_context_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.common_context.insert(key.into(), value.into());
        self
    }
}
