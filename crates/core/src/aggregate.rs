// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The aggregated result document (spec §3, §4.5): the shape the Result
//! Aggregator produces and the Persister writes to disk.

use crate::finding::{Finding, Severity};
use crate::service::ServiceKind;
use crate::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateMetadata {
    pub task_id: TaskId,
    pub target_model: String,
    pub target_app_number: u32,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    pub duration_ms: u64,
}

/// Per-service outcome recorded under `services` (spec §4.5 "skip and error
/// handling").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceEntry {
    Skipped { reason: String },
    Success,
    NoIssues,
    Error { error: String },
}

/// Flat tool_name -> outcome map entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolEntry {
    pub status: String,
    pub total_issues: usize,
    pub severity_counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub total_findings: usize,
    pub severity_histogram: BTreeMap<String, usize>,
    pub tools_executed: usize,
    pub services_executed: usize,
    pub findings_by_tool: BTreeMap<String, usize>,
    pub findings_by_service: BTreeMap<String, usize>,
}

impl Summary {
    pub fn from_findings(findings: &[Finding], services_executed: usize, tools_executed: usize) -> Self {
        let mut severity_histogram: BTreeMap<String, usize> = BTreeMap::new();
        let mut findings_by_tool: BTreeMap<String, usize> = BTreeMap::new();
        let mut findings_by_service: BTreeMap<String, usize> = BTreeMap::new();

        for f in findings {
            *severity_histogram.entry(severity_key(f.severity)).or_default() += 1;
            *findings_by_tool.entry(f.tool.clone()).or_default() += 1;
            *findings_by_service.entry(f.service.clone()).or_default() += 1;
        }

        Self {
            total_findings: findings.len(),
            severity_histogram,
            tools_executed,
            services_executed,
            findings_by_tool,
            findings_by_service,
        }
    }
}

fn severity_key(s: Severity) -> String {
    s.to_string()
}

/// The full in-memory aggregated document, transferred from the Dispatcher
/// to the Persister.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub metadata: AggregateMetadata,
    pub services: BTreeMap<ServiceKind, ServiceEntry>,
    pub tools: BTreeMap<String, ToolEntry>,
    pub findings: Vec<Finding>,
    pub summary: Summary,
    pub errors: BTreeMap<ServiceKind, String>,
}
