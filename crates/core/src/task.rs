// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and subtask shapes, and the task state machine (spec §3, §4.1).

use crate::clock::Clock;
use crate::options::TaskOptions;
use crate::service::{AnalysisType, ServiceKind};
use crate::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Where a task submission originated (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Cli,
    Api,
    Pipeline,
}

crate::simple_display! {
    TaskSource {
        Cli => "cli",
        Api => "api",
        Pipeline => "pipeline",
    }
}

/// Task lifecycle status (spec §4.1 state machine).
///
/// `Pending -> Running -> {Completed, PartialSuccess, Failed, Cancelled}`.
/// No transitions leave a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    PartialSuccess,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        PartialSuccess => "partial_success",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::PartialSuccess | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition per the state machine.
    /// Terminal states never transition further; `Pending` may go to
    /// `Running` or straight to `Cancelled`; `Running` may go to any
    /// terminal state.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self {
            TaskStatus::Pending => matches!(next, TaskStatus::Running | TaskStatus::Cancelled),
            TaskStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

/// Per-service subtask outcome (spec §3). Subtasks are not independently
/// persisted before execution — they are materialized as rows in the
/// aggregated result once the dispatcher has joined on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Skipped,
    Success,
    NoIssues,
    Partial,
    Error,
}

crate::simple_display! {
    SubtaskStatus {
        Skipped => "skipped",
        Success => "success",
        NoIssues => "no_issues",
        Partial => "partial",
        Error => "error",
    }
}

/// The logical unit of work for one `(task_id, service)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub service: ServiceKind,
    pub tools: BTreeSet<String>,
    pub status: SubtaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Inputs to create a new task (mirrors the `TaskSubmitter.create` contract
/// in spec §6.1).
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub target_model: String,
    pub target_app_number: u32,
    pub analysis_type: AnalysisType,
    pub requested_tools: BTreeSet<String>,
    pub source: TaskSource,
    pub options: TaskOptions,
}

/// A submitted analysis task and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub target_model: String,
    pub target_app_number: u32,
    pub analysis_type: AnalysisType,
    pub requested_tools: BTreeSet<String>,
    pub tools_by_service: BTreeMap<ServiceKind, BTreeSet<String>>,
    pub status: TaskStatus,
    pub progress: u8,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    pub source: TaskSource,
    pub options: TaskOptions,
}

impl Task {
    pub fn new(task_id: TaskId, config: TaskConfig, clock: &impl Clock) -> Self {
        Self {
            task_id,
            target_model: config.target_model,
            target_app_number: config.target_app_number,
            analysis_type: config.analysis_type,
            requested_tools: config.requested_tools,
            tools_by_service: BTreeMap::new(),
            status: TaskStatus::Pending,
            progress: 0,
            created_at_ms: clock.epoch_ms(),
            started_at_ms: None,
            completed_at_ms: None,
            error_message: None,
            result_path: None,
            source: config.source,
            options: config.options,
        }
    }

    /// Invariant (spec §3): `progress == 100` iff status is terminal.
    pub fn progress_invariant_holds(&self) -> bool {
        (self.progress == 100) == self.status.is_terminal()
    }

    /// Invariant (spec §3): `started_at <= completed_at` when both present.
    pub fn timestamps_ordered(&self) -> bool {
        match (self.started_at_ms, self.completed_at_ms) {
            (Some(s), Some(c)) => s <= c,
            _ => true,
        }
    }

    pub fn set_progress(&mut self, progress: u8) {
        // Progress writes are monotonic (spec §4.6): never move backwards.
        if progress > self.progress {
            self.progress = progress.min(100);
        }
    }

    pub fn pipeline_key(&self) -> Option<(String, u32, String)> {
        self.options
            .pipeline_id
            .as_ref()
            .map(|pid| (self.target_model.clone(), self.target_app_number, pid.clone()))
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
