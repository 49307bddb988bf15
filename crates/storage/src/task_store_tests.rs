// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orch_core::{AnalysisType, FakeClock, TaskOptions, TaskSource};
use std::collections::BTreeSet;

fn config() -> TaskConfig {
    TaskConfig {
        target_model: "openai_gpt-4o".to_string(),
        target_app_number: 1,
        analysis_type: AnalysisType::Static,
        requested_tools: BTreeSet::new(),
        source: TaskSource::Cli,
        options: TaskOptions::default(),
    }
}

fn config_with_pipeline(pipeline_id: &str) -> TaskConfig {
    let mut c = config();
    c.options.pipeline_id = Some(pipeline_id.to_string());
    c
}

#[test]
fn create_returns_pending_task() {
    let store = TaskStore::new(FakeClock::new());
    let task = store.create(config()).expect("create failed");
    assert_eq!(task.status, TaskStatus::Pending);
}

#[test]
fn duplicate_pipeline_id_is_rejected_while_non_terminal() {
    let store = TaskStore::new(FakeClock::new());
    store.create(config_with_pipeline("pipe-1")).expect("first create failed");
    let err = store.create(config_with_pipeline("pipe-1")).unwrap_err();
    assert!(matches!(err, StoreError::DuplicatePipeline { .. }));
}

#[test]
fn duplicate_pipeline_id_is_allowed_after_first_completes() {
    let store = TaskStore::new(FakeClock::new());
    let first = store.create(config_with_pipeline("pipe-2")).expect("create failed");
    store.lease_ready(10, Duration::from_secs(60));
    store.complete(first.task_id, TaskStatus::Completed, None, None).expect("complete failed");

    let second = store.create(config_with_pipeline("pipe-2"));
    assert!(second.is_ok());
}

#[test]
fn find_duplicate_returns_the_matching_task() {
    let store = TaskStore::new(FakeClock::new());
    let task = store.create(config_with_pipeline("pipe-3")).expect("create failed");
    let found = store.find_duplicate("openai_gpt-4o", 1, "pipe-3").expect("expected a match");
    assert_eq!(found.task_id, task.task_id);
    assert!(store.find_duplicate("openai_gpt-4o", 1, "pipe-missing").is_none());
}

#[test]
fn lease_ready_transitions_pending_to_running_up_to_limit() {
    let store = TaskStore::new(FakeClock::new());
    for _ in 0..3 {
        store.create(config()).expect("create failed");
    }
    let leased = store.lease_ready(2, Duration::from_secs(30));
    assert_eq!(leased.len(), 2);
    assert!(leased.iter().all(|t| t.status == TaskStatus::Running));
}

#[test]
fn complete_rejects_illegal_transition_from_pending() {
    let store = TaskStore::new(FakeClock::new());
    let task = store.create(config()).expect("create failed");
    let err = store.complete(task.task_id, TaskStatus::Completed, None, None).unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition { .. }));
}

#[test]
fn complete_sets_progress_and_timestamps() {
    let clock = FakeClock::new();
    let store = TaskStore::new(clock.clone());
    let task = store.create(config()).expect("create failed");
    store.lease_ready(10, Duration::from_secs(60));
    clock.advance(Duration::from_millis(500));
    let done = store.complete(task.task_id, TaskStatus::Completed, None, None).expect("complete failed");
    assert_eq!(done.progress, 100);
    assert!(done.completed_at_ms.is_some());
    assert!(done.timestamps_ordered());
}

#[test]
fn cancel_is_legal_from_pending() {
    let store = TaskStore::new(FakeClock::new());
    let task = store.create(config()).expect("create failed");
    let cancelled = store.cancel(task.task_id).expect("cancel failed");
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
}

#[test]
fn sweep_reclaims_tasks_with_expired_leases() {
    let clock = FakeClock::new();
    let store = TaskStore::new(clock.clone());
    let task = store.create(config()).expect("create failed");
    store.lease_ready(10, Duration::from_secs(10));

    clock.advance(Duration::from_secs(11));
    let reclaimed = store.sweep_expired_leases();
    assert_eq!(reclaimed, vec![task.task_id]);

    let after = store.get(task.task_id).expect("get failed");
    assert_eq!(after.status, TaskStatus::Failed);
    assert_eq!(after.error_message.as_deref(), Some("lease expired"));
}

#[test]
fn sweep_leaves_unexpired_leases_alone() {
    let clock = FakeClock::new();
    let store = TaskStore::new(clock.clone());
    let task = store.create(config()).expect("create failed");
    store.lease_ready(10, Duration::from_secs(60));

    clock.advance(Duration::from_secs(5));
    assert!(store.sweep_expired_leases().is_empty());
    assert_eq!(store.get(task.task_id).expect("get failed").status, TaskStatus::Running);
}

#[test]
fn snapshot_recovers_task_table_across_store_instances() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let snapshot_path = dir.path().join("tasks.json");

    let store = TaskStore::new(FakeClock::new()).with_snapshot_path(&snapshot_path);
    let task = store.create(config()).expect("create failed");

    let recovered = TaskStore::recover(FakeClock::new(), &snapshot_path);
    let found = recovered.get(task.task_id).expect("should recover the task");
    assert_eq!(found.status, TaskStatus::Pending);
}
