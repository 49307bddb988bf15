// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Task Store (spec §4.1): an in-process, lease-based task table guarded
//! by a `parking_lot::Mutex`, matching the corpus's `Arc<Mutex<...>>`
//! materialized-state pattern. Durability is provided by an optional JSON
//! snapshot written after every mutation, not by event-sourced replay — the
//! store itself is the single source of truth while the process is live.

use crate::atomic::write_atomic;
use crate::error::StoreError;
use orch_core::{Clock, Task, TaskConfig, TaskId, TaskStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Lease {
    expires_at_ms: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct TaskTable {
    tasks: HashMap<TaskId, Task>,
    leases: HashMap<TaskId, Lease>,
    /// `(model, app_number, pipeline_id) -> task_id`, for non-terminal tasks only.
    pipeline_index: HashMap<(String, u32, String), TaskId>,
}

impl TaskTable {
    fn reindex_pipeline(&mut self, task: &Task) {
        if let Some(key) = task.pipeline_key() {
            if task.status.is_terminal() {
                self.pipeline_index.remove(&key);
            } else {
                self.pipeline_index.insert(key, task.task_id);
            }
        }
    }
}

pub struct TaskStore<C: Clock> {
    clock: C,
    snapshot_path: Option<PathBuf>,
    table: Mutex<TaskTable>,
}

impl<C: Clock> TaskStore<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, snapshot_path: None, table: Mutex::new(TaskTable::default()) }
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Recover a task table from a snapshot written by a prior process. A
    /// missing or unreadable snapshot yields an empty store — this is a
    /// recovery aid, not the sole record of truth.
    pub fn recover(clock: C, snapshot_path: impl Into<PathBuf>) -> Self {
        let snapshot_path = snapshot_path.into();
        let table = std::fs::read(&snapshot_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self { clock, snapshot_path: Some(snapshot_path), table: Mutex::new(table) }
    }

    fn snapshot(&self, table: &TaskTable) {
        let Some(path) = &self.snapshot_path else { return };
        match serde_json::to_vec_pretty(table) {
            Ok(bytes) => {
                if let Err(e) = write_atomic(path, &bytes) {
                    tracing::warn!(error = %e, "failed to write task store snapshot");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize task store snapshot"),
        }
    }

    pub fn create(&self, config: TaskConfig) -> Result<Task, StoreError> {
        let mut table = self.table.lock();

        if let Some(pipeline_id) = &config.options.pipeline_id {
            let key = (config.target_model.clone(), config.target_app_number, pipeline_id.clone());
            if table.pipeline_index.contains_key(&key) {
                return Err(StoreError::DuplicatePipeline {
                    model: config.target_model,
                    app_number: config.target_app_number,
                    pipeline_id: pipeline_id.clone(),
                });
            }
        }

        let task = Task::new(TaskId::new(), config, &self.clock);
        table.reindex_pipeline(&task);
        table.tasks.insert(task.task_id, task.clone());
        self.snapshot(&table);
        Ok(task)
    }

    pub fn find_duplicate(&self, model: &str, app_number: u32, pipeline_id: &str) -> Option<Task> {
        let table = self.table.lock();
        let key = (model.to_string(), app_number, pipeline_id.to_string());
        table.pipeline_index.get(&key).and_then(|id| table.tasks.get(id)).cloned()
    }

    pub fn get(&self, task_id: TaskId) -> Result<Task, StoreError> {
        self.table
            .lock()
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))
    }

    /// Atomically mark up to `limit` `PENDING` tasks as `RUNNING` with a
    /// lease deadline, and return them (spec §4.1 `lease_ready`).
    pub fn lease_ready(&self, limit: usize, lease_ttl: Duration) -> Vec<Task> {
        let mut table = self.table.lock();
        let now = self.clock.epoch_ms();
        let expires_at_ms = now + lease_ttl.as_millis() as u64;

        let ready_ids: Vec<TaskId> = table
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .take(limit)
            .map(|t| t.task_id)
            .collect();

        let mut leased = Vec::with_capacity(ready_ids.len());
        for id in ready_ids {
            if let Some(task) = table.tasks.get_mut(&id) {
                task.status = TaskStatus::Running;
                task.started_at_ms = Some(now);
                table.leases.insert(id, Lease { expires_at_ms });
                leased.push(task.clone());
            }
        }
        if !leased.is_empty() {
            self.snapshot(&table);
        }
        leased
    }

    pub fn extend_lease(&self, task_id: TaskId, lease_ttl: Duration) -> Result<(), StoreError> {
        let mut table = self.table.lock();
        if !table.tasks.contains_key(&task_id) {
            return Err(StoreError::NotFound(task_id.to_string()));
        }
        let now = self.clock.epoch_ms();
        let expires_at_ms = now + lease_ttl.as_millis() as u64;
        match table.leases.get_mut(&task_id) {
            Some(lease) => {
                lease.expires_at_ms = expires_at_ms;
                Ok(())
            }
            None => Err(StoreError::NoActiveLease(task_id.to_string())),
        }
    }

    /// Apply an in-place mutation to a task (progress updates, error
    /// messages, `tools_by_service`, etc).
    pub fn update(&self, task_id: TaskId, f: impl FnOnce(&mut Task)) -> Result<Task, StoreError> {
        let mut table = self.table.lock();
        let task = table.tasks.get_mut(&task_id).ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        f(task);
        let updated = task.clone();
        table.reindex_pipeline(&updated);
        self.snapshot(&table);
        Ok(updated)
    }

    /// Transition a task to a terminal status, clearing its lease.
    pub fn complete(
        &self,
        task_id: TaskId,
        terminal_status: TaskStatus,
        error_message: Option<String>,
        result_path: Option<std::path::PathBuf>,
    ) -> Result<Task, StoreError> {
        let mut table = self.table.lock();
        let now = self.clock.epoch_ms();
        let task = table.tasks.get_mut(&task_id).ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;

        if !task.status.can_transition_to(terminal_status) {
            return Err(StoreError::InvalidTransition {
                task_id: task_id.to_string(),
                from: task.status.to_string(),
                to: terminal_status.to_string(),
            });
        }

        task.status = terminal_status;
        task.progress = 100;
        task.completed_at_ms = Some(now);
        task.error_message = error_message;
        task.result_path = result_path;
        let updated = task.clone();
        table.reindex_pipeline(&updated);
        table.leases.remove(&task_id);
        self.snapshot(&table);
        Ok(updated)
    }

    /// Cancel a task (legal from `PENDING` or `RUNNING`, spec §4.1).
    pub fn cancel(&self, task_id: TaskId) -> Result<Task, StoreError> {
        self.complete(task_id, TaskStatus::Cancelled, None, None)
    }

    /// Reclaim `RUNNING` tasks whose lease has expired, marking them
    /// `FAILED` (spec §4.1 lease-expiry recovery). Returns the reclaimed
    /// task ids.
    pub fn sweep_expired_leases(&self) -> Vec<TaskId> {
        let mut table = self.table.lock();
        let now = self.clock.epoch_ms();

        let expired: Vec<TaskId> = table
            .leases
            .iter()
            .filter(|(_, lease)| lease.expires_at_ms <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(task) = table.tasks.get_mut(id) {
                if task.status == TaskStatus::Running {
                    task.status = TaskStatus::Failed;
                    task.progress = 100;
                    task.completed_at_ms = Some(now);
                    task.error_message = Some("lease expired".to_string());
                    let updated = task.clone();
                    table.reindex_pipeline(&updated);
                }
            }
            table.leases.remove(id);
        }

        if !expired.is_empty() {
            self.snapshot(&table);
        }
        expired
    }
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
