// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only builders shared across crates via the `test-support` feature.

use crate::finding::{Finding, Severity};
use crate::options::TaskOptions;
use crate::service::AnalysisType;
use crate::task::{Task, TaskSource, TaskStatus};
use crate::TaskId;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

crate::builder! {
    pub struct TaskBuilder => Task {
        computed {
            task_id: TaskId = TaskId::new()
        }
        into {
            target_model: String = "openai_gpt-4o",
            analysis_type: AnalysisType = AnalysisType::Static
        }
        set {
            target_app_number: u32 = 1,
            requested_tools: BTreeSet<String> = BTreeSet::new(),
            tools_by_service: BTreeMap<crate::service::ServiceKind, BTreeSet<String>> = BTreeMap::new(),
            status: TaskStatus = TaskStatus::Pending,
            progress: u8 = 0,
            created_at_ms: u64 = 1_700_000_000_000,
            source: TaskSource = TaskSource::Cli,
            options: TaskOptions = TaskOptions::default()
        }
        option {
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            error_message: String = None,
            result_path: PathBuf = None
        }
    }
}

/// Build a minimal `Finding` for tests, with sensible defaults for the
/// fields most tests don't care about.
pub fn test_finding(service: &str, tool: &str, severity: Severity, rule_id: &str) -> Finding {
    Finding {
        tool: tool.to_string(),
        service: service.to_string(),
        severity,
        category: "general".to_string(),
        message: format!("{tool} finding"),
        file: Some("app.py".to_string()),
        line: Some(1),
        column: None,
        rule_id: Some(rule_id.to_string()),
        raw: None,
    }
}
