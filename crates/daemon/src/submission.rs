// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task-submission listener (spec §6.1): the collaborator-facing edge,
//! kept intentionally thin. Reuses the analyzer transport's length-prefixed
//! JSON framing for a small request/response protocol of its own, exposed
//! so `orch-cli` can speak it without depending on the daemon's internals.

use crate::dispatcher::Dispatcher;
use orch_core::{AnalysisType, Clock, Task, TaskConfig, TaskId, TaskOptions, TaskSource, TaskStatus};
use orch_storage::TaskStore;
use orch_wire::{decode, encode, read_message, write_message};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Collaborator → daemon submission requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum SubmitRequest {
    Create {
        model: String,
        app_number: u32,
        analysis_type: AnalysisType,
        #[serde(default)]
        requested_tools: BTreeSet<String>,
        source: TaskSource,
        #[serde(default)]
        pipeline_id: Option<String>,
    },
    Get {
        task_id: TaskId,
    },
    Cancel {
        task_id: TaskId,
    },
}

/// Daemon → collaborator submission responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum SubmitResponse {
    Task(Task),
    Error { message: String },
}

pub struct SubmissionListener<C: Clock> {
    store: Arc<TaskStore<C>>,
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C: Clock + 'static> SubmissionListener<C> {
    pub fn new(store: Arc<TaskStore<C>>, dispatcher: Arc<Dispatcher<C>>) -> Self {
        Self { store, dispatcher }
    }

    /// Bind `addr` and accept submission connections until `shutdown`
    /// fires, spawning one handler task per connection (mirrors the
    /// corpus's spawn-per-connection listener idiom).
    pub async fn serve(self: Arc<Self>, addr: &str, shutdown: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "submission listener bound");
        self.run(listener, shutdown).await
    }

    /// Accept connections on an already-bound listener until `shutdown`
    /// fires. Split out from [`Self::serve`] so tests can bind an
    /// ephemeral port and learn its address before serving.
    pub async fn run(self: Arc<Self>, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("submission listener shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = this.handle_connection(stream).await {
                            tracing::debug!(%peer, error = %e, "submission connection closed");
                        }
                    });
                }
            }
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> Result<(), orch_wire::ProtocolError> {
        loop {
            let raw = match read_message(&mut stream).await {
                Ok(raw) => raw,
                Err(_) => return Ok(()),
            };
            let request: SubmitRequest = decode(&raw)?;
            let response = self.handle_request(request);
            let bytes = encode(&response)?;
            write_message(&mut stream, &bytes).await?;
        }
    }

    fn handle_request(&self, request: SubmitRequest) -> SubmitResponse {
        match request {
            SubmitRequest::Create { model, app_number, analysis_type, requested_tools, source, pipeline_id } => {
                let options = TaskOptions { pipeline_id, ..Default::default() };
                let config = TaskConfig {
                    target_model: model,
                    target_app_number: app_number,
                    analysis_type,
                    requested_tools,
                    source,
                    options,
                };
                match self.store.create(config) {
                    Ok(task) => SubmitResponse::Task(task),
                    Err(e) => SubmitResponse::Error { message: e.to_string() },
                }
            }
            SubmitRequest::Get { task_id } => self.lookup(task_id),
            SubmitRequest::Cancel { task_id } => {
                self.dispatcher.cancel_task(task_id);
                self.lookup(task_id)
            }
        }
    }

    fn lookup(&self, task_id: TaskId) -> SubmitResponse {
        match self.store.get(task_id) {
            Ok(task) => SubmitResponse::Task(task),
            Err(e) => SubmitResponse::Error { message: e.to_string() },
        }
    }
}

#[allow(dead_code)]
fn assert_terminal(status: TaskStatus) -> bool {
    status.is_terminal()
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
