// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration tests: the testable properties and
//! end-to-end scenarios this system is built against, exercised across
//! crate boundaries through the Dispatcher's public control loop rather
//! than within a single crate's `#[cfg(test)]` module.

use orch_adapters::{AnalyzerClient, FakeAnalyzerClient};
use orch_core::{
    normalize, AnalysisType, FakeClock, PortBinding, ServiceKind, Task, TaskConfig, TaskId, TaskOptions, TaskSource,
    TaskStatus,
};
use orch_daemon::{Dispatcher, DispatcherConfig, TokioExecutor};
use orch_engine::{AppLocator, LocatedApp};
use orch_storage::{Persister, TaskStore};
use orch_wire::{AnalyzerResponse, RequestId};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct FixedLocator {
    result: Result<LocatedApp, orch_core::Error>,
}

impl AppLocator for FixedLocator {
    fn locate(&self, _model: &str, _app_number: u32) -> Result<LocatedApp, orch_core::Error> {
        self.result.clone()
    }
}

fn located(dir: &str, ports: Option<PortBinding>) -> Result<LocatedApp, orch_core::Error> {
    Ok(LocatedApp { source_dir: PathBuf::from(dir), ports })
}

/// Dispatched with a short poll interval so tests don't wait out the
/// production default.
fn dispatcher_with(
    locator: FixedLocator,
    clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>>,
    results_dir: &std::path::Path,
) -> (Arc<Dispatcher<FakeClock>>, Arc<TaskStore<FakeClock>>) {
    let clock = FakeClock::new();
    let store = Arc::new(TaskStore::new(clock.clone()));
    let persister = Arc::new(Persister::new(results_dir));
    let config = DispatcherConfig { poll_interval: Duration::from_millis(5), ..DispatcherConfig::default() };
    let dispatcher =
        Arc::new(Dispatcher::new(Arc::clone(&store), Arc::new(locator), clients, HashMap::new(), persister, clock, config));
    (dispatcher, store)
}

/// Runs the dispatch loop in the background until `task_id` reaches a
/// terminal status, then shuts the loop down and returns the final task.
async fn run_until_terminal(dispatcher: Arc<Dispatcher<FakeClock>>, store: Arc<TaskStore<FakeClock>>, task_id: TaskId) -> Task {
    let shutdown = CancellationToken::new();
    let executor = Arc::new(TokioExecutor::new(4));
    let handle = {
        let dispatcher = Arc::clone(&dispatcher);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { dispatcher.run_forever(executor, shutdown).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let result = loop {
        if let Ok(task) = store.get(task_id) {
            if task.status.is_terminal() {
                break task;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            shutdown.cancel();
            let _ = handle.await;
            panic!("task {task_id} did not reach a terminal status before the test deadline");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    shutdown.cancel();
    let _ = handle.await;
    result
}

fn submit(store: &TaskStore<FakeClock>, config: TaskConfig) -> Task {
    store.create(config).expect("create must succeed")
}

// Invariant 1: idempotent normalization.
#[test]
fn normalization_is_idempotent() {
    for input in ["Anthropic/Claude-3.5-Sonnet", "openai_gpt-4o", "  Google/Gemini 2.0 Flash  ", "already_canonical"] {
        let once = normalize(input);
        let twice = normalize(&once);
        assert_eq!(once, twice, "normalize must be idempotent for {input:?}");
    }
}

// Invariant 2: the persisted task directory's id segment carries the
// `task_` prefix exactly once, whether or not the caller's own id already
// carried it.
#[test]
fn persisted_task_directory_has_the_prefix_exactly_once() {
    let bare = TaskId::from_string("abc123");
    let prefixed = TaskId::ensure_prefixed("abc123");
    let doubly_prefixed = TaskId::ensure_prefixed(format!("{}{}", TaskId::PREFIX, "abc123"));

    for id in [bare.suffix().to_string(), prefixed.to_string(), doubly_prefixed.to_string()] {
        let canonical = TaskId::ensure_prefixed(&id);
        let rendered = canonical.to_string();
        assert_eq!(rendered.matches(TaskId::PREFIX).count(), 1, "{rendered} must carry the prefix exactly once");
    }
}

// Invariant 3: no port configuration means no analyzer is ever called.
#[tokio::test]
async fn no_ports_means_no_analyze_call_for_dynamic_analysis() {
    struct CountingClient(AtomicUsize);

    #[async_trait::async_trait]
    impl AnalyzerClient for CountingClient {
        async fn analyze(
            &self,
            _request: orch_wire::AnalyzerRequest,
            _deadline: Duration,
            _cancel: CancellationToken,
        ) -> Result<AnalyzerResponse, orch_adapters::ClientError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(AnalyzerResponse::no_issues(RequestId::new("r")))
        }

        async fn health(&self) -> Result<(), orch_adapters::ClientError> {
            Ok(())
        }
    }

    let counter = Arc::new(CountingClient(AtomicUsize::new(0)));
    let mut clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>> = HashMap::new();
    clients.insert(ServiceKind::Dynamic, Arc::clone(&counter) as Arc<dyn AnalyzerClient>);

    let dir = tempfile::tempdir().expect("tempdir");
    let (dispatcher, store) =
        dispatcher_with(FixedLocator { result: located("/apps/m/app3", None) }, clients, dir.path());

    let task = submit(
        &store,
        TaskConfig {
            target_model: "google_gemini-2-0-flash".to_string(),
            target_app_number: 3,
            analysis_type: AnalysisType::Dynamic,
            requested_tools: BTreeSet::new(),
            source: TaskSource::Api,
            options: TaskOptions::default(),
        },
    );

    let updated = run_until_terminal(dispatcher, Arc::clone(&store), task.task_id).await;
    assert_eq!(updated.status, TaskStatus::Failed);
    assert!(updated.error_message.as_deref().unwrap_or_default().contains("no port configuration"));
    assert_eq!(counter.0.load(Ordering::SeqCst), 0, "the dynamic client must never be invoked");
}

// Invariant 5 / S4: partial-failure derivation with a mixed outcome set.
#[tokio::test]
async fn mixed_outcomes_yield_partial_success() {
    let mut clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>> = HashMap::new();
    clients.insert(
        ServiceKind::Static,
        Arc::new(FakeAnalyzerClient::new(vec![Ok(AnalyzerResponse::no_issues(RequestId::new("r1")))])),
    );
    clients.insert(
        ServiceKind::Dynamic,
        Arc::new(FakeAnalyzerClient::new(vec![Ok(AnalyzerResponse::no_issues(RequestId::new("r2")))])),
    );
    clients.insert(
        ServiceKind::Performance,
        Arc::new(FakeAnalyzerClient::new(vec![Err(orch_adapters::ClientError::RemoteError {
            addr: "perf:9".to_string(),
            message: "tool crashed".to_string(),
        })])),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let (dispatcher, store) = dispatcher_with(
        FixedLocator { result: located("/apps/m/app1", Some(PortBinding { backend_port: 8000, frontend_port: 3000 })) },
        clients,
        dir.path(),
    );

    let mut requested = BTreeSet::new();
    for tool in ["bandit", "eslint", "locust"] {
        requested.insert(tool.to_string());
    }
    let task = submit(
        &store,
        TaskConfig {
            target_model: "m".to_string(),
            target_app_number: 1,
            analysis_type: AnalysisType::Unified,
            requested_tools: requested,
            source: TaskSource::Api,
            options: TaskOptions::default(),
        },
    );

    let updated = run_until_terminal(dispatcher, Arc::clone(&store), task.task_id).await;
    assert_eq!(updated.status, TaskStatus::PartialSuccess);
}

// Invariant 9: duplicate-pipeline prevention rejects the second submission.
#[test]
fn duplicate_pipeline_submissions_are_rejected() {
    let clock = FakeClock::new();
    let store = TaskStore::new(clock);

    let config = |pipeline_id: &str| TaskConfig {
        target_model: "m".to_string(),
        target_app_number: 1,
        analysis_type: AnalysisType::Static,
        requested_tools: BTreeSet::new(),
        source: TaskSource::Pipeline,
        options: TaskOptions { pipeline_id: Some(pipeline_id.to_string()), ..Default::default() },
    };

    let first = store.create(config("run-42")).expect("first create succeeds");
    let second = store.create(config("run-42"));

    assert!(second.is_err(), "a second create with the same pipeline id must be rejected");
    let duplicate = store.find_duplicate("m", 1, "run-42").expect("duplicate indexed");
    assert_eq!(duplicate.task_id, first.task_id);
}

// Invariant 10: an expired lease is swept to FAILED with "lease expired".
#[test]
fn expired_leases_are_swept_to_failed() {
    let clock = FakeClock::new();
    let store = TaskStore::new(clock.clone());

    store
        .create(TaskConfig {
            target_model: "m".to_string(),
            target_app_number: 1,
            analysis_type: AnalysisType::Static,
            requested_tools: BTreeSet::new(),
            source: TaskSource::Api,
            options: TaskOptions::default(),
        })
        .expect("create succeeds");

    let leased = store.lease_ready(1, Duration::from_secs(10)).into_iter().next().expect("leased");
    clock.advance(Duration::from_secs(11));

    let swept = store.sweep_expired_leases();
    assert_eq!(swept, vec![leased.task_id]);

    let updated = store.get(leased.task_id).expect("task exists");
    assert_eq!(updated.status, TaskStatus::Failed);
    assert_eq!(updated.error_message.as_deref(), Some("lease expired"));
}

// S1: happy static analysis end to end.
#[tokio::test]
async fn s1_happy_static_analysis_dispatches_exactly_once() {
    let dispatched = Arc::new(AtomicUsize::new(0));

    struct CountingStatic(Arc<AtomicUsize>);
    #[async_trait::async_trait]
    impl AnalyzerClient for CountingStatic {
        async fn analyze(
            &self,
            request: orch_wire::AnalyzerRequest,
            _deadline: Duration,
            _cancel: CancellationToken,
        ) -> Result<AnalyzerResponse, orch_adapters::ClientError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(AnalyzerResponse::no_issues(request.request_id().clone()))
        }
        async fn health(&self) -> Result<(), orch_adapters::ClientError> {
            Ok(())
        }
    }

    let mut clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>> = HashMap::new();
    clients.insert(ServiceKind::Static, Arc::new(CountingStatic(Arc::clone(&dispatched))));

    let dir = tempfile::tempdir().expect("tempdir");
    let (dispatcher, store) = dispatcher_with(
        FixedLocator { result: located("/apps/anthropic_claude-3-5-sonnet/app1", None) },
        clients,
        dir.path(),
    );

    let mut requested = BTreeSet::new();
    requested.insert("bandit".to_string());
    requested.insert("ruff".to_string());
    let task = submit(
        &store,
        TaskConfig {
            target_model: "anthropic/claude-3.5-sonnet".to_string(),
            target_app_number: 1,
            analysis_type: AnalysisType::Static,
            requested_tools: requested,
            source: TaskSource::Api,
            options: TaskOptions::default(),
        },
    );

    let updated = run_until_terminal(dispatcher, Arc::clone(&store), task.task_id).await;
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(dispatched.load(Ordering::SeqCst), 1, "exactly one analyze call to the static client");

    let result_path = updated.result_path.expect("completed task has a result path");
    let rendered = result_path.display().to_string();
    assert!(rendered.contains("anthropic_claude-3-5-sonnet/app1"), "path was {rendered}");
    assert!(rendered.contains(&format!("{}", task.task_id)));
}

// S2: submitting against a model/app with no matching directory fails fast
// with zero analyze calls.
#[tokio::test]
async fn s2_missing_app_fails_with_zero_analyze_calls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (dispatcher, store) = dispatcher_with(
        FixedLocator { result: Err(orch_core::Error::not_found("openai_codex-mini app4 does not exist")) },
        HashMap::new(),
        dir.path(),
    );

    let task = submit(
        &store,
        TaskConfig {
            target_model: "openai/codex-mini".to_string(),
            target_app_number: 4,
            analysis_type: AnalysisType::Static,
            requested_tools: BTreeSet::new(),
            source: TaskSource::Api,
            options: TaskOptions::default(),
        },
    );

    let updated = run_until_terminal(dispatcher, Arc::clone(&store), task.task_id).await;
    assert_eq!(updated.status, TaskStatus::Failed);
    assert!(updated.error_message.as_deref().unwrap_or_default().contains("does not exist"));
}

// S6: a whitespace rule normalizes down to a low-severity bucket regardless
// of the tool's own reported native severity.
#[tokio::test]
async fn s6_whitespace_rule_normalizes_to_a_low_severity_bucket() {
    let payload = serde_json::json!({
        "findings": [
            { "rule_id": "whitespace-trailing", "severity": "error", "category": "style" }
        ]
    });
    let mut results = std::collections::BTreeMap::new();
    results.insert("ruff".to_string(), payload);

    let mut clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>> = HashMap::new();
    clients.insert(
        ServiceKind::Static,
        Arc::new(FakeAnalyzerClient::new(vec![Ok(AnalyzerResponse::success(RequestId::new("r"), results))])),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let (dispatcher, store) =
        dispatcher_with(FixedLocator { result: located("/apps/m/app1", None) }, clients, dir.path());

    let mut requested = BTreeSet::new();
    requested.insert("ruff".to_string());
    let task = submit(
        &store,
        TaskConfig {
            target_model: "m".to_string(),
            target_app_number: 1,
            analysis_type: AnalysisType::Static,
            requested_tools: requested,
            source: TaskSource::Api,
            options: TaskOptions::default(),
        },
    );

    let updated = run_until_terminal(dispatcher, Arc::clone(&store), task.task_id).await;
    assert_eq!(updated.status, TaskStatus::Completed);

    let result_path = updated.result_path.expect("completed task has a result path");
    let body = std::fs::read_to_string(&result_path).expect("result file readable");
    let value: serde_json::Value = serde_json::from_str(&body).expect("result is valid json");
    let severity = value["findings"][0]["severity"].as_str().expect("finding has a severity");
    assert_eq!(severity, "info");
}
