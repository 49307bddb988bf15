// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Dispatcher control loop (spec §4.6): lease acquisition, bounded
//! worker-group submission, fail-fast app/port validation, concurrent
//! fan-out with shared cancellation, partial-failure join, aggregate +
//! persist + terminal transition.

use crate::executor::Executor;
use orch_adapters::AnalyzerClient;
use orch_core::{Clock, PortBinding, ServiceKind, Task, TaskId, TaskStatus};
use orch_engine::{aggregate, AggregationOutput, AggregatorInput, AppLocator, LocatedApp, ServiceOutcome};
use orch_storage::{Persister, TaskStore};
use orch_wire::{AnalyzerRequest, RequestId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Added to the sum of per-subtask deadlines to get the per-task total
/// deadline (spec §5): "sum of per-subtask deadlines plus a small
/// aggregation budget".
const AGGREGATION_BUDGET: Duration = Duration::from_secs(30);

/// Tunables that are not themselves per-service (those live on the
/// `AnalyzerClient`s and the `ToolRegistry`).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub worker_parallelism: usize,
    pub lease_ttl: Duration,
    pub poll_interval: Duration,
    pub artifact_threshold_bytes: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_parallelism: 4,
            lease_ttl: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
            artifact_threshold_bytes: 32 * 1024,
        }
    }
}

pub struct Dispatcher<C: Clock> {
    store: Arc<TaskStore<C>>,
    locator: Arc<dyn AppLocator>,
    clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>>,
    timeouts: HashMap<ServiceKind, Duration>,
    registry: orch_core::ToolRegistry,
    persister: Arc<Persister>,
    clock: C,
    config: DispatcherConfig,
    /// In-flight tasks' cancellation tokens, keyed by task id, so an
    /// external `cancel(task_id)` call can reach a running dispatch.
    cancellations: Mutex<HashMap<TaskId, CancellationToken>>,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(
        store: Arc<TaskStore<C>>,
        locator: Arc<dyn AppLocator>,
        clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>>,
        timeouts: HashMap<ServiceKind, Duration>,
        persister: Arc<Persister>,
        clock: C,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            locator,
            clients,
            timeouts,
            registry: orch_core::ToolRegistry::default(),
            persister,
            clock,
            config,
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    /// Request cancellation of a task. If it is currently dispatched, its
    /// cancellation token is tripped and observed at the next suspension
    /// point inside each in-flight `analyze` call (spec §4.6). If it is
    /// still `PENDING`, the Task Store transitions it directly.
    pub fn cancel_task(&self, task_id: TaskId) {
        let token = self.cancellations.lock().get(&task_id).cloned();
        match token {
            Some(token) => token.cancel(),
            None => {
                if let Err(e) = self.store.cancel(task_id) {
                    tracing::warn!(%task_id, error = %e, "cancel requested for a task that could not be cancelled directly");
                }
            }
        }
    }

    /// Run the lease-expiry recovery sweep on a fixed interval until
    /// `shutdown` fires (spec §4.1, `ORCH_LEASE_SWEEP_MS`).
    pub async fn run_lease_sweeper(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {}
            }
            let expired = self.store.sweep_expired_leases();
            if !expired.is_empty() {
                tracing::warn!(count = expired.len(), "reclaimed tasks with expired leases");
            }
        }
    }

    /// The main control loop (spec §4.6, steps 1-2): lease up to
    /// `worker_parallelism` ready tasks and submit each to the executor.
    pub async fn run_forever(self: Arc<Self>, executor: Arc<dyn Executor>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("dispatcher loop shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let ready = self.store.lease_ready(self.config.worker_parallelism, self.config.lease_ttl);
            if ready.is_empty() {
                continue;
            }
            tracing::debug!(count = ready.len(), "leased tasks for dispatch");

            let jobs: Vec<BoxedJob> = ready
                .into_iter()
                .map(|task| {
                    let this = Arc::clone(&self);
                    Box::pin(async move { this.process_task(task).await }) as BoxedJob
                })
                .collect();

            executor.run_all(jobs).await;
        }
    }

    /// Steps 3-8 for a single leased task.
    async fn process_task(self: Arc<Self>, task: Task) {
        let cancel = CancellationToken::new();
        self.cancellations.lock().insert(task.task_id, cancel.clone());

        let renew_stop = CancellationToken::new();
        let renew_handle = tokio::spawn(Self::renew_lease_periodically(
            Arc::clone(&self.store),
            task.task_id,
            self.config.lease_ttl,
            renew_stop.clone(),
        ));

        let outcome = self.run_task(&task, cancel.clone()).await;
        self.cancellations.lock().remove(&task.task_id);
        renew_stop.cancel();
        let _ = renew_handle.await;

        match outcome {
            Err(message) => {
                tracing::warn!(task_id = %task.task_id, error = %message, "task failed fast validation");
                if let Err(e) = self.store.complete(task.task_id, TaskStatus::Failed, Some(message), None) {
                    tracing::error!(task_id = %task.task_id, error = %e, "failed to record fail-fast terminal status");
                }
            }
            Ok(output) => self.finish_task(&task, output).await,
        }
    }

    /// Keep a dispatched task's lease alive (spec §4.1). Per-subtask
    /// deadlines routinely exceed `lease_ttl`; without renewal the sweep
    /// would reclaim a task that is still legitimately running.
    async fn renew_lease_periodically(store: Arc<TaskStore<C>>, task_id: TaskId, lease_ttl: Duration, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(lease_ttl / 2);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = stop.cancelled() => return,
                _ = ticker.tick() => {
                    if let Err(e) = store.extend_lease(task_id, lease_ttl) {
                        tracing::debug!(%task_id, error = %e, "lease renewal stopped");
                        return;
                    }
                }
            }
        }
    }

    /// Steps 3-6: validate, compute `tools_by_service`, fan out, join.
    /// Returns `Err(message)` for the fail-fast validation cases (step 3)
    /// and for the overall per-task deadline (spec §5); otherwise the
    /// aggregated outcome ready for step 7.
    async fn run_task(&self, task: &Task, cancel: CancellationToken) -> Result<AggregationOutput, String> {
        let located =
            self.locator.locate(&task.target_model, task.target_app_number).map_err(|_| "app does not exist".to_string())?;

        let candidates = task.analysis_type.candidate_services();
        if candidates.iter().any(|s| s.requires_ports()) && located.ports.is_none() {
            return Err("no port configuration".to_string());
        }

        let tools_by_service = self.registry.group_by_service(&task.requested_tools, &candidates);
        if let Err(e) = self.store.update(task.task_id, |t| {
            t.tools_by_service = tools_by_service.clone();
            t.set_progress(10);
        }) {
            tracing::warn!(task_id = %task.task_id, error = %e, "failed to record tools_by_service");
        }

        // Per-task total deadline: sum of the per-subtask deadlines plus a
        // small aggregation budget (spec §5). Subtasks run concurrently, so
        // this is a generous ceiling, not an estimate of wall-clock time.
        let total_deadline: Duration = candidates
            .iter()
            .map(|s| self.timeouts.get(s).copied().unwrap_or_else(|| s.default_timeout()))
            .sum::<Duration>()
            + AGGREGATION_BUDGET;

        let fanout = async {
            let mut outcomes: BTreeMap<ServiceKind, ServiceOutcome> = BTreeMap::new();
            let mut handles = Vec::new();

            for &service in &candidates {
                let Some(tools) = tools_by_service.get(&service) else {
                    outcomes.insert(
                        service,
                        ServiceOutcome::Skipped { reason: "no tools selected for this service".to_string() },
                    );
                    continue;
                };

                let Some(client) = self.clients.get(&service) else {
                    outcomes.insert(service, ServiceOutcome::Failed(format!("no analyzer configured for service {service}")));
                    continue;
                };

                let request = build_request(service, task, &located, tools);
                let deadline = self.timeouts.get(&service).copied().unwrap_or_else(|| service.default_timeout());
                let client = Arc::clone(client);
                let cancel_child = cancel.clone();
                handles.push((
                    service,
                    tokio::spawn(async move { client.analyze(request, deadline, cancel_child).await }),
                ));
            }

            // Step 6: join with partial-failure tolerance — wait for every
            // call, never cancel siblings because one errored. Progress
            // climbs monotonically as each attempted subtask completes.
            let attempted = handles.len();
            for (completed, (service, handle)) in handles.into_iter().enumerate() {
                let outcome = match handle.await {
                    Ok(Ok(response)) => ServiceOutcome::Responded(response),
                    Ok(Err(client_err)) => ServiceOutcome::Failed(client_err.to_string()),
                    Err(join_err) => ServiceOutcome::Failed(format!("subtask task panicked: {join_err}")),
                };
                outcomes.insert(service, outcome);

                let fraction_done = ((completed + 1) * 80 / attempted) as u8;
                if let Err(e) = self.store.update(task.task_id, |t| t.set_progress(10 + fraction_done)) {
                    tracing::warn!(task_id = %task.task_id, error = %e, "failed to record progress");
                }
            }

            outcomes
        };

        let outcomes = match tokio::time::timeout(total_deadline, fanout).await {
            Ok(outcomes) => outcomes,
            Err(_) => {
                cancel.cancel();
                return Err("task deadline exceeded".to_string());
            }
        };

        let completed_at_ms = self.clock.epoch_ms();
        Ok(aggregate(AggregatorInput {
            task_id: task.task_id,
            target_model: task.target_model.clone(),
            target_app_number: task.target_app_number,
            created_at_ms: task.created_at_ms,
            started_at_ms: task.started_at_ms,
            completed_at_ms,
            outcomes,
            cancelled: cancel.is_cancelled(),
            artifact_threshold_bytes: self.config.artifact_threshold_bytes,
        }))
    }

    /// Step 7/8: persist and transition to the derived terminal status, or
    /// mark `FAILED` if persistence itself fails.
    async fn finish_task(&self, task: &Task, output: AggregationOutput) {
        let now_ms = self.clock.epoch_ms();
        match self.persister.persist(
            &output.result,
            task.analysis_type,
            output.terminal_status,
            &output.service_snapshots,
            &output.artifacts,
            now_ms,
        ) {
            Ok(paths) => {
                tracing::info!(
                    task_id = %task.task_id,
                    status = %output.terminal_status,
                    duration_ms = output.result.metadata.duration_ms,
                    "task reached a terminal status"
                );
                if let Err(e) = self.store.complete(task.task_id, output.terminal_status, None, Some(paths.result_path)) {
                    tracing::error!(task_id = %task.task_id, error = %e, "failed to record terminal status");
                }
            }
            Err(e) => {
                tracing::error!(task_id = %task.task_id, error = %e, "failed to persist aggregated result");
                if let Err(e) = self.store.complete(task.task_id, TaskStatus::Failed, Some(e.to_string()), None) {
                    tracing::error!(task_id = %task.task_id, error = %e, "failed to record persistence failure");
                }
            }
        }
    }
}

fn build_request(service: ServiceKind, task: &Task, located: &LocatedApp, tools: &BTreeSet<String>) -> AnalyzerRequest {
    let request_id = RequestId::new(nanoid::nanoid!(12));
    let model = task.target_model.clone();
    let app_number = task.target_app_number;
    let source_dir = located.source_dir.display().to_string();
    let tools: Vec<String> = tools.iter().cloned().collect();

    match service {
        ServiceKind::Static => {
            AnalyzerRequest::StaticAnalyze { request_id, model, app_number, source_dir, tools, options: Default::default() }
        }
        ServiceKind::Dynamic => AnalyzerRequest::DynamicAnalyze {
            request_id,
            model,
            app_number,
            source_dir,
            target_urls: target_urls(located.ports),
            tools,
            options: Default::default(),
        },
        ServiceKind::Performance => AnalyzerRequest::PerformanceTest {
            request_id,
            model,
            app_number,
            source_dir,
            target_urls: target_urls(located.ports),
            tools,
            options: Default::default(),
        },
        ServiceKind::Ai => {
            AnalyzerRequest::AiAnalyze { request_id, model, app_number, source_dir, tools, options: Default::default() }
        }
    }
}

fn target_urls(ports: Option<PortBinding>) -> Vec<String> {
    match ports {
        Some(p) => vec![format!("http://127.0.0.1:{}", p.backend_port), format!("http://127.0.0.1:{}", p.frontend_port)],
        None => Vec::new(),
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
