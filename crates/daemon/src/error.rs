// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-local error type for the submission listener (spec §7).

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate pipeline task: {model} app{app_number} pipeline {pipeline_id}")]
    DuplicatePipeline { model: String, app_number: u32, pipeline_id: String },

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<orch_storage::StoreError> for SubmitError {
    fn from(e: orch_storage::StoreError) -> Self {
        match e {
            orch_storage::StoreError::DuplicatePipeline { model, app_number, pipeline_id } => {
                SubmitError::DuplicatePipeline { model, app_number, pipeline_id }
            }
            orch_storage::StoreError::NotFound(id) => SubmitError::NotFound(id),
            other => SubmitError::Internal(other.to_string()),
        }
    }
}
