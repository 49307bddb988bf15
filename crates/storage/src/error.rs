// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage-local error types, mapped onto [`orch_core::ErrorKind`] at the
//! dispatcher boundary (spec §7).

use orch_core::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(String),

    #[error("a non-terminal task already exists for ({model}, app{app_number}, {pipeline_id})")]
    DuplicatePipeline { model: String, app_number: u32, pipeline_id: String },

    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidTransition { task_id: String, from: String, to: String },

    #[error("task {0} has no active lease")]
    NoActiveLease(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::DuplicatePipeline { .. } => ErrorKind::Validation,
            StoreError::InvalidTransition { .. } => ErrorKind::Internal,
            StoreError::NoActiveLease(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("io error writing {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PersistenceError
    }
}
