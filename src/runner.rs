//! Assertion, benchmark and profiling modes over a list of cases.

use crate::{ApiTestCase, Config, Host, HostExt, Profiler, ProfilingReport, parse_envelope};

/// Runs every case as its own group and asserts its response code.
pub fn run_api_tests(host: &dyn Host, cases: &[ApiTestCase], config: &Config) {
    for case in cases {
        host.group(&case.name, &mut |h| run_single(h, case, config));
    }
}

fn run_single(host: &dyn Host, case: &ApiTestCase, config: &Config) {
    let recorder = host.require_ok(case.execute_handler(config), "handler execution failed");
    if config.log_response {
        host.log(&format!("Response: {}", recorder.body_string()));
    }
    let response = host.require_ok(parse_envelope(&recorder.body), "invalid response body");
    let Some(expected) = case.expected_code else {
        host.fail_now(&format!("case {:?} has no expected code", case.name));
    };
    host.require_eq(expected, response.code, "unexpected response code");
}

/// Repeats the handler for the host's iteration budget without asserting.
pub fn run_benchmark(host: &dyn Host, case: &ApiTestCase, config: &Config) {
    host.group(&case.name, &mut |h| {
        for _ in 0..h.iterations() {
            if let Err(err) = case.execute_handler(config) {
                tracing::warn!("benchmark {:?} iteration failed: {err}", case.name);
            }
        }
    });
}

/// Profiles `case` inside a group. A fatal profiling error fails the group;
/// degraded steps are logged to the host and kept in the report.
pub fn run_profiling(
    host: &dyn Host,
    case: &ApiTestCase,
    profiler: &Profiler,
) -> Option<ProfilingReport> {
    let mut report = None;
    host.group(&case.name, &mut |h| match profiler.run(h, case) {
        Ok(r) => {
            for warning in &r.warnings {
                h.log(&format!("profiling warning: {}", warning.message));
            }
            report = Some(r);
        }
        Err(err) => h.fail_now(&format!("profiling {:?} failed: {err}", case.name)),
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiResponse, HarnessResult, OutputFormat, StdHost};
    use http::{Method, StatusCode};
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn replying(code: i64) -> ApiTestCase {
        ApiTestCase::new(format!("replies {code}"), Method::GET, "/status", move |ctx| {
            let body = ApiResponse::new(code, 1, "ok").envelope();
            ctx.json(StatusCode::OK, &body);
        })
    }

    #[test]
    fn matching_code_passes() {
        let host = StdHost::new("api");
        run_api_tests(&host, &[replying(200).expect_code(200)], &Config::default());
        host.finish().expect("no failures");
    }

    #[test]
    fn mismatched_code_fails_only_that_case() {
        let host = StdHost::new("api");
        let cases = [
            replying(200).expect_code(200),
            replying(404).expect_code(200),
        ];
        run_api_tests(&host, &cases, &Config::default());
        let failures = host.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "api/replies 404");
        assert!(failures[0].message.contains("unexpected response code"));
    }

    #[test]
    fn unparseable_body_fails_with_parse_message() {
        let host = StdHost::new("api");
        let case = ApiTestCase::new("plain", Method::GET, "/", |ctx| {
            ctx.string(StatusCode::OK, "not json");
        })
        .expect_code(200);
        run_api_tests(&host, &[case], &Config::default());
        let failures = host.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("could not unmarshal JSON response"));
    }

    #[test]
    fn missing_response_key_fails() {
        let host = StdHost::new("api");
        let case = ApiTestCase::new("bare", Method::GET, "/", |ctx| {
            ctx.json(StatusCode::OK, &serde_json::json!({"code": 200}));
        })
        .expect_code(200);
        run_api_tests(&host, &[case], &Config::default());
        assert!(host.failures()[0].message.contains("missing \"response\" key"));
    }

    #[test]
    fn parallel_workers_each_observe_their_own_response() {
        use crate::Host;
        use std::sync::Mutex;

        let handler = ApiTestCase::new("echo worker", Method::GET, "/workers/:id", |ctx| {
            let id: i64 = ctx.param("id").and_then(|v| v.parse().ok()).unwrap_or(-1);
            let tag = ctx.get("tag").cloned().unwrap_or_default();
            let body = ApiResponse::new(200 + id, 1, "ok")
                .with_data(serde_json::json!({"id": id, "tag": tag}))
                .envelope();
            ctx.json(StatusCode::OK, &body);
        });
        let host = StdHost::new("parallel").with_iterations(400).with_parallelism(8);
        let next_worker = AtomicUsize::new(0);
        let checked = Mutex::new(Vec::new());
        let config = Config::default();

        host.run_parallel(&|it| {
            let worker = next_worker.fetch_add(1, Ordering::SeqCst) as i64;
            let case = handler
                .clone()
                .path_param("id", worker.to_string())
                .context_key("tag", format!("worker-{worker}"))
                .expect_code(200 + worker);
            while it.next() {
                let recorder = case.execute_handler(&config).expect("execute");
                let response = parse_envelope(&recorder.body).expect("envelope");
                assert_eq!(Some(response.code), case.expected_code);
                assert_eq!(
                    response.data,
                    Some(serde_json::json!({"id": worker, "tag": format!("worker-{worker}")}))
                );
            }
            checked
                .lock()
                .expect("lock")
                .push((worker, it.completed()));
        });

        let checked = checked.into_inner().expect("lock");
        assert_eq!(checked.len(), 8);
        assert_eq!(checked.iter().map(|(_, n)| n).sum::<u64>(), 400);
        let mut workers: Vec<i64> = checked.iter().map(|(w, _)| *w).collect();
        workers.sort_unstable();
        assert_eq!(workers, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn benchmark_runs_iteration_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let case = ApiTestCase::new("bench", Method::GET, "/", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let host = StdHost::new("bench").with_iterations(25);
        run_benchmark(&host, &case, &Config::default());
        host.finish().expect("no failures");
        assert_eq!(calls.load(Ordering::Relaxed), 25);
    }

    #[test]
    fn profiling_failure_fails_the_group() {
        use crate::profiling::{CpuSession, FixedSampler, TEST_SESSION_LOCK};
        use std::sync::PoisonError;

        let _serial = TEST_SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let holder = tempfile::NamedTempFile::new().expect("temp");
        let active = CpuSession::start(&FixedSampler(Vec::new()), holder.path()).expect("start");

        let root = std::env::temp_dir().join(format!("pariksha-runner-{}", uuid::Uuid::new_v4()));
        let profiler = Profiler::new(Config::default().output_root(&root))
            .with_sampler(FixedSampler(Vec::new()))
            .with_renderer(|_: &Path, _: OutputFormat| -> HarnessResult<Vec<u8>> { Ok(Vec::new()) });
        let host = StdHost::new("profile");
        let report = run_profiling(&host, &replying(200), &profiler);
        active.stop().expect("stop");

        assert!(report.is_none());
        assert_eq!(host.failures().len(), 1);
        assert!(host.failures()[0].message.contains("already active"));
    }
}
