// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Persister (spec §4.7): writes the aggregated document, per-service
//! snapshots, extracted artifacts, and a manifest under a deterministic
//! directory layout rooted at `<results>/<canonical_slug>/app<N>/<task_id>/`.

use crate::atomic::write_atomic;
use crate::error::PersistError;
use orch_core::{normalize, AggregatedResult, AnalysisType, ServiceKind, TaskStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Paths the Persister actually wrote, returned so the caller can set
/// `Task.result_path` without re-deriving the layout.
#[derive(Debug, Clone)]
pub struct PersistedPaths {
    pub task_dir: PathBuf,
    pub result_path: PathBuf,
    pub manifest_path: PathBuf,
}

#[derive(Serialize)]
struct Manifest<'a> {
    task_id: String,
    model: &'a str,
    app_number: u32,
    analysis_type: String,
    status: String,
    created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at_ms: Option<u64>,
    duration_ms: u64,
    file_list: Vec<String>,
}

pub struct Persister {
    results_root: PathBuf,
}

impl Persister {
    pub fn new(results_root: impl Into<PathBuf>) -> Self {
        Self { results_root: results_root.into() }
    }

    /// Write the full layout for one task. `service_snapshots` holds the
    /// unextracted per-service payload (spec §4.5 "preserve the unextracted
    /// version"); `artifacts` holds extracted artifact bytes keyed by the
    /// filename they land under in `sarif/`. `now_ms` drives the timestamp
    /// embedded in the result filename — passed in rather than read from the
    /// wall clock so persistence stays deterministic under test.
    pub fn persist(
        &self,
        result: &AggregatedResult,
        analysis_type: AnalysisType,
        status: TaskStatus,
        service_snapshots: &BTreeMap<ServiceKind, serde_json::Value>,
        artifacts: &BTreeMap<String, Vec<u8>>,
        now_ms: u64,
    ) -> Result<PersistedPaths, PersistError> {
        let meta = &result.metadata;
        let slug = normalize(&meta.target_model);
        let task_dir = self
            .results_root
            .join(&slug)
            .join(format!("app{}", meta.target_app_number))
            .join(meta.task_id.to_string());

        let mut file_list = Vec::new();

        let timestamp = format_timestamp_utc(now_ms);
        let result_filename =
            format!("{slug}_app{}_{}_{timestamp}.json", meta.target_app_number, meta.task_id);
        let result_path = task_dir.join(&result_filename);
        let body = serde_json::to_vec_pretty(result)?;
        write_atomic(&result_path, &body).map_err(|e| io_err(&result_path, e))?;
        file_list.push(result_filename);

        if !artifacts.is_empty() {
            let sarif_dir = task_dir.join("sarif");
            for (name, bytes) in artifacts {
                let path = sarif_dir.join(name);
                write_atomic(&path, bytes).map_err(|e| io_err(&path, e))?;
                file_list.push(format!("sarif/{name}"));
            }
        }

        if !service_snapshots.is_empty() {
            let services_dir = task_dir.join("services");
            for (service, payload) in service_snapshots {
                let filename = format!("{service}.json");
                let path = services_dir.join(&filename);
                let bytes = serde_json::to_vec_pretty(payload)?;
                write_atomic(&path, &bytes).map_err(|e| io_err(&path, e))?;
                file_list.push(format!("services/{filename}"));
            }
        }

        let manifest = Manifest {
            task_id: meta.task_id.to_string(),
            model: &meta.target_model,
            app_number: meta.target_app_number,
            analysis_type: analysis_type.to_string(),
            status: status.to_string(),
            created_at_ms: meta.created_at_ms,
            started_at_ms: meta.started_at_ms,
            completed_at_ms: meta.completed_at_ms,
            duration_ms: meta.duration_ms,
            file_list,
        };
        let manifest_path = task_dir.join("manifest.json");
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(&manifest_path, &manifest_bytes).map_err(|e| io_err(&manifest_path, e))?;

        Ok(PersistedPaths { task_dir, result_path, manifest_path })
    }
}

fn io_err(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io { path: path.display().to_string(), source }
}

/// `YYYYMMDD_HHMMSS`, UTC (spec §4.7).
fn format_timestamp_utc(epoch_ms: u64) -> String {
    let secs = (epoch_ms / 1000) as i64;
    let dt = chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default();
    dt.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
