// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orchd`: the orchestration daemon binary. Assembles the Task Store, the
//! App Locator, one Analyzer Client per configured service, the Persister,
//! and the Dispatcher, then runs the dispatch loop, the lease sweeper, and
//! the submission listener concurrently until a shutdown signal arrives.

use orch_adapters::{AnalyzerClient, TcpAnalyzerClient};
use orch_core::{ServiceKind, SystemClock};
use orch_daemon::{env, Dispatcher, DispatcherConfig, SubmissionListener, TokioExecutor};
use orch_engine::FilesystemLocator;
use orch_storage::{Persister, TaskStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let store = Arc::new(TaskStore::recover(SystemClock, env::snapshot_path()));
    let locator = Arc::new(FilesystemLocator::new(env::apps_root()));
    let persister = Arc::new(Persister::new(env::results_root()));

    let mut clients: HashMap<ServiceKind, Arc<dyn AnalyzerClient>> = HashMap::new();
    let mut timeouts: HashMap<ServiceKind, Duration> = HashMap::new();
    for &service in &ServiceKind::ALL {
        timeouts.insert(service, env::service_timeout(service));
        let Some(addr) = env::service_addr(service) else {
            tracing::info!(%service, "no endpoint configured, this service kind will never be dispatched to");
            continue;
        };
        clients.insert(
            service,
            Arc::new(TcpAnalyzerClient::new(
                addr,
                env::pool_size(),
                env::breaker_threshold(),
                env::breaker_cooldown(),
                env::BREAKER_COOLDOWN_CAP,
                env::health_probe_ttl(),
                SystemClock,
            )),
        );
    }

    let config = DispatcherConfig { worker_parallelism: env::worker_parallelism(), ..DispatcherConfig::default() };
    let dispatcher =
        Arc::new(Dispatcher::new(Arc::clone(&store), locator, clients, timeouts, persister, SystemClock, config));

    let shutdown = CancellationToken::new();
    let executor = Arc::new(TokioExecutor::new(env::worker_parallelism()));
    let submission_listener = Arc::new(SubmissionListener::new(Arc::clone(&store), Arc::clone(&dispatcher)));

    let dispatch_task = {
        let dispatcher = Arc::clone(&dispatcher);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { dispatcher.run_forever(executor, shutdown).await })
    };

    let sweep_task = {
        let dispatcher = Arc::clone(&dispatcher);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { dispatcher.run_lease_sweeper(env::lease_sweep_interval(), shutdown).await })
    };

    let submit_task = {
        let shutdown = shutdown.clone();
        let addr = env::submit_addr();
        tokio::spawn(async move {
            if let Err(e) = submission_listener.serve(&addr, shutdown).await {
                tracing::error!(error = %e, "submission listener exited with an error");
            }
        })
    };

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
    shutdown.cancel();

    let _ = tokio::join!(dispatch_task, sweep_task, submit_task);
}
