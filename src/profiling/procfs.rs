//! Readers for `/proc/self`, the data source behind the snapshot profiles.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{HarnessError, HarnessResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub vm_size_kb: u64,
    pub vm_rss_kb: u64,
    pub vm_hwm_kb: u64,
    pub threads: u64,
    pub voluntary_ctxt_switches: u64,
    pub nonvoluntary_ctxt_switches: u64,
}

impl ProcStatus {
    pub fn read() -> HarnessResult<Self> {
        let text = std::fs::read_to_string("/proc/self/status").map_err(|e| {
            HarnessError::Capture(format!("cannot read /proc/self/status: {e}"))
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        for line in text.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let value = rest
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            match key.trim() {
                "VmSize" => out.vm_size_kb = value,
                "VmRSS" => out.vm_rss_kb = value,
                "VmHWM" => out.vm_hwm_kb = value,
                "Threads" => out.threads = value,
                "voluntary_ctxt_switches" => out.voluntary_ctxt_switches = value,
                "nonvoluntary_ctxt_switches" => out.nonvoluntary_ctxt_switches = value,
                _ => {}
            }
        }
        out
    }
}

/// Live threads of this process keyed by thread name.
pub fn thread_names() -> HarnessResult<BTreeMap<String, u64>> {
    thread_names_in(Path::new("/proc/self/task"))
}

fn thread_names_in(task_dir: &Path) -> HarnessResult<BTreeMap<String, u64>> {
    let entries = std::fs::read_dir(task_dir).map_err(|e| {
        HarnessError::Capture(format!("cannot list {}: {e}", task_dir.display()))
    })?;
    let mut out = BTreeMap::new();
    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        // Threads may exit between listing and reading.
        let name = match std::fs::read_to_string(entry.path().join("comm")) {
            Ok(s) => s.trim().to_string(),
            Err(_) => continue,
        };
        let name = if name.is_empty() {
            "unnamed".to_string()
        } else {
            name
        };
        *out.entry(name).or_insert(0) += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tbench\nVmSize:\t  204800 kB\nVmHWM:\t   10240 kB\nVmRSS:\t    8192 kB\nThreads:\t9\nvoluntary_ctxt_switches:\t120\nnonvoluntary_ctxt_switches:\t7\n";

    #[test]
    fn parses_status_fields() {
        let st = ProcStatus::parse(STATUS);
        assert_eq!(
            st,
            ProcStatus {
                vm_size_kb: 204800,
                vm_rss_kb: 8192,
                vm_hwm_kb: 10240,
                threads: 9,
                voluntary_ctxt_switches: 120,
                nonvoluntary_ctxt_switches: 7,
            }
        );
    }

    #[test]
    fn groups_threads_by_name() {
        let root = std::env::temp_dir().join(format!("pariksha-task-{}", uuid::Uuid::new_v4()));
        for (tid, name) in [("1", "main\n"), ("2", "worker\n"), ("3", "worker\n"), ("4", "\n")] {
            let dir = root.join(tid);
            std::fs::create_dir_all(&dir).expect("mkdir");
            std::fs::write(dir.join("comm"), name).expect("comm");
        }
        let names = thread_names_in(&root).expect("names");
        assert_eq!(names.get("worker"), Some(&2));
        assert_eq!(names.get("main"), Some(&1));
        assert_eq!(names.get("unnamed"), Some(&1));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reads_own_status_on_linux() {
        let st = ProcStatus::read().expect("status");
        assert!(st.threads >= 1);
        assert!(st.vm_rss_kb > 0);
    }
}
