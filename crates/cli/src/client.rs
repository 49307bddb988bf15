// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DaemonClient`: a thin connection to `orchd`'s submission listener. One
//! request per connection, matching the framing the daemon itself speaks
//! (spec §6.1) — no persistent session, no retries; a collaborator that
//! wants resiliency wraps this, this just speaks the wire protocol.

use orch_core::{AnalysisType, Task, TaskId, TaskSource};
use orch_daemon::{SubmitRequest, SubmitResponse};
use orch_wire::{decode, encode};
use std::collections::BTreeSet;
use thiserror::Error;
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach orchd at {addr}: {source}")]
    Connect { addr: String, #[source] source: std::io::Error },

    #[error("wire protocol error: {0}")]
    Protocol(#[from] orch_wire::ProtocolError),

    #[error("the daemon refused the request: {0}")]
    Rejected(String),
}

pub struct DaemonClient {
    addr: String,
}

impl DaemonClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn send(&self, request: &SubmitRequest) -> Result<Task, ClientError> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| ClientError::Connect { addr: self.addr.clone(), source })?;

        let bytes = encode(request)?;
        orch_wire::write_message(&mut stream, &bytes).await?;

        let raw = orch_wire::read_message(&mut stream).await?;
        match decode(&raw)? {
            SubmitResponse::Task(task) => Ok(task),
            SubmitResponse::Error { message } => Err(ClientError::Rejected(message)),
        }
    }

    pub async fn submit(
        &self,
        model: String,
        app_number: u32,
        analysis_type: AnalysisType,
        requested_tools: BTreeSet<String>,
        pipeline_id: Option<String>,
    ) -> Result<Task, ClientError> {
        self.send(&SubmitRequest::Create {
            model,
            app_number,
            analysis_type,
            requested_tools,
            source: TaskSource::Cli,
            pipeline_id,
        })
        .await
    }

    pub async fn get(&self, task_id: TaskId) -> Result<Task, ClientError> {
        self.send(&SubmitRequest::Get { task_id }).await
    }

    pub async fn cancel(&self, task_id: TaskId) -> Result<Task, ClientError> {
        self.send(&SubmitRequest::Cancel { task_id }).await
    }
}
