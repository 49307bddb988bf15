// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn config() -> TaskConfig {
    TaskConfig {
        target_model: "openai_gpt-4o".to_string(),
        target_app_number: 3,
        analysis_type: AnalysisType::Static,
        requested_tools: BTreeSet::new(),
        source: TaskSource::Cli,
        options: TaskOptions::default(),
    }
}

#[test]
fn new_task_starts_pending_with_zero_progress() {
    let clock = FakeClock::new();
    let task = Task::new(TaskId::new(), config(), &clock);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.progress, 0);
    assert!(task.progress_invariant_holds());
    assert!(task.started_at_ms.is_none());
}

#[test]
fn task_id_always_has_prefix_exactly_once() {
    let clock = FakeClock::new();
    let task = Task::new(TaskId::ensure_prefixed("deadbeef"), config(), &clock);
    let s = task.task_id.to_string();
    assert_eq!(s.matches("task_").count(), 1);
}

#[test]
fn pending_may_go_to_running_or_cancelled_only() {
    assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
    assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
    assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
}

#[test]
fn running_may_go_to_any_terminal_state() {
    for terminal in [
        TaskStatus::Completed,
        TaskStatus::PartialSuccess,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        assert!(TaskStatus::Running.can_transition_to(terminal));
    }
    assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Pending));
}

#[test]
fn terminal_states_never_transition_further() {
    for terminal in [
        TaskStatus::Completed,
        TaskStatus::PartialSuccess,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        assert!(terminal.is_terminal());
        assert!(!terminal.can_transition_to(TaskStatus::Running));
        assert!(!terminal.can_transition_to(terminal));
    }
}

#[test]
fn progress_invariant_rejects_terminal_without_full_progress() {
    let clock = FakeClock::new();
    let mut task = Task::new(TaskId::new(), config(), &clock);
    task.status = TaskStatus::Completed;
    task.progress = 90;
    assert!(!task.progress_invariant_holds());
    task.progress = 100;
    assert!(task.progress_invariant_holds());
}

#[test]
fn set_progress_never_moves_backwards() {
    let clock = FakeClock::new();
    let mut task = Task::new(TaskId::new(), config(), &clock);
    task.set_progress(50);
    task.set_progress(30);
    assert_eq!(task.progress, 50);
    task.set_progress(80);
    assert_eq!(task.progress, 80);
}

#[test]
fn timestamps_ordered_holds_when_either_is_absent() {
    let clock = FakeClock::new();
    let task = Task::new(TaskId::new(), config(), &clock);
    assert!(task.timestamps_ordered());
}

#[test]
fn timestamps_ordered_fails_when_completed_before_started() {
    let clock = FakeClock::new();
    let mut task = Task::new(TaskId::new(), config(), &clock);
    task.started_at_ms = Some(200);
    task.completed_at_ms = Some(100);
    assert!(!task.timestamps_ordered());
}

#[test]
fn pipeline_key_present_only_when_pipeline_id_set() {
    let clock = FakeClock::new();
    let task = Task::new(TaskId::new(), config(), &clock);
    assert!(task.pipeline_key().is_none());

    let mut cfg = config();
    cfg.options.pipeline_id = Some("pipe-7".to_string());
    let task = Task::new(TaskId::new(), cfg, &clock);
    assert_eq!(
        task.pipeline_key(),
        Some(("openai_gpt-4o".to_string(), 3, "pipe-7".to_string()))
    );
}
