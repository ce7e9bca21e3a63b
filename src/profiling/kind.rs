//! Names of the snapshot profile kinds and the rendered output formats.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::HarnessError;

/// Point-in-time profiles captured after the CPU profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Process memory.
    Heap,
    /// Live worker threads, grouped by name.
    Goroutine,
    /// Blocking (voluntary context switches) during the CPU session.
    Block,
    /// Contention (involuntary context switches) during the CPU session.
    Mutex,
    /// Threads created by the process.
    #[serde(rename = "threadcreate")]
    ThreadCreate,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 5] = [
        ProfileKind::Heap,
        ProfileKind::Goroutine,
        ProfileKind::Block,
        ProfileKind::Mutex,
        ProfileKind::ThreadCreate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heap => "heap",
            Self::Goroutine => "goroutine",
            Self::Block => "block",
            Self::Mutex => "mutex",
            Self::ThreadCreate => "threadcreate",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| HarnessError::UnknownProfileKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Pdf,
}

impl OutputFormat {
    /// Exact, case-sensitive match on `"png"` / `"pdf"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }

    /// Flag understood by `pprof`-style renderers.
    pub fn flag(self) -> String {
        format!("-{}", self.as_str())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| HarnessError::UnsupportedFormat(s.to_string()))
    }
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Png, Self::Pdf]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_config_names() {
        for kind in ProfileKind::ALL {
            assert_eq!(kind.as_str().parse::<ProfileKind>().expect("parse"), kind);
        }
        assert!(matches!(
            "allocs".parse::<ProfileKind>(),
            Err(HarnessError::UnknownProfileKind(_))
        ));
    }

    #[test]
    fn formats_are_exact_matches() {
        assert_eq!(OutputFormat::parse("png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("pdf"), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::parse("PNG"), None);
        assert_eq!(OutputFormat::parse("svg"), None);
        assert_eq!(OutputFormat::Pdf.flag(), "-pdf");
    }

    #[test]
    fn threadcreate_serializes_without_separator() {
        let json = serde_json::to_string(&ProfileKind::ThreadCreate).expect("json");
        assert_eq!(json, "\"threadcreate\"");
    }
}
