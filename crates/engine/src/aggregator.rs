// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Result Aggregator (spec §4.5): turns per-service dispatch outcomes
//! into an [`AggregatedResult`] plus the terminal status it implies, the
//! artifacts that must be written under `sarif/`, and the unextracted
//! per-service snapshots that must be written under `services/`.

use crate::severity::normalize_severity;
use orch_core::finding::sort_findings;
use orch_core::{
    AggregateMetadata, AggregatedResult, Finding, ServiceEntry, ServiceKind, Summary, TaskId, TaskStatus, ToolEntry,
};
use orch_wire::{AnalyzerResponse, ResponseStatus};
use std::collections::BTreeMap;

/// Default size, in bytes, above which a tool's raw payload is extracted
/// to `sarif/` even if it isn't SARIF-shaped (spec §4.5 "[ADDED] Size
/// threshold").
pub const DEFAULT_ARTIFACT_THRESHOLD_BYTES: usize = 32 * 1024;

/// What happened for one service during dispatch, as observed by the
/// dispatcher (spec §4.6 steps 4-6).
pub enum ServiceOutcome {
    /// No tool in `tools_by_service` routed to this service.
    Skipped { reason: String },
    /// The worker answered (`success` or `no_issues`).
    Responded(AnalyzerResponse),
    /// The analyzer client returned an error (any of the closed taxonomy).
    Failed(String),
}

pub struct AggregatorInput {
    pub task_id: TaskId,
    pub target_model: String,
    pub target_app_number: u32,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: u64,
    pub outcomes: BTreeMap<ServiceKind, ServiceOutcome>,
    pub cancelled: bool,
    pub artifact_threshold_bytes: usize,
}

pub struct AggregationOutput {
    pub result: AggregatedResult,
    pub terminal_status: TaskStatus,
    /// `sarif/<service>_<category>_<tool>.sarif.json` -> bytes.
    pub artifacts: BTreeMap<String, Vec<u8>>,
    /// `services/<service>.json` payload, unextracted (spec §4.5.3).
    pub service_snapshots: BTreeMap<ServiceKind, serde_json::Value>,
}

/// Build the aggregated document and derive the task's terminal status.
pub fn aggregate(input: AggregatorInput) -> AggregationOutput {
    let mut services = BTreeMap::new();
    let mut tools = BTreeMap::new();
    let mut findings = Vec::new();
    let mut errors = BTreeMap::new();
    let mut artifacts = BTreeMap::new();
    let mut service_snapshots = BTreeMap::new();

    let mut attempted_succeeded = 0usize;
    let mut attempted_errored = 0usize;

    for (service, outcome) in input.outcomes {
        match outcome {
            ServiceOutcome::Skipped { reason } => {
                services.insert(service, ServiceEntry::Skipped { reason });
            }
            ServiceOutcome::Failed(message) => {
                attempted_errored += 1;
                errors.insert(service, message.clone());
                services.insert(service, ServiceEntry::Error { error: message });
            }
            ServiceOutcome::Responded(response) => {
                if response.status == ResponseStatus::Error {
                    let message = response.error.clone().unwrap_or_default();
                    attempted_errored += 1;
                    errors.insert(service, message.clone());
                    services.insert(service, ServiceEntry::Error { error: message });
                    continue;
                }

                attempted_succeeded += 1;
                service_snapshots.insert(service, serde_json::to_value(&response.results).unwrap_or_default());

                for (tool, payload) in &response.results {
                    let tool_findings = extract_findings(service, tool, payload);
                    let mut severity_counts: BTreeMap<String, usize> = BTreeMap::new();
                    for f in &tool_findings {
                        *severity_counts.entry(f.severity.to_string()).or_default() += 1;
                    }

                    let artifact_ref = if needs_extraction(payload, input.artifact_threshold_bytes) {
                        let category = if is_sarif_shaped(payload) {
                            "sarif".to_string()
                        } else {
                            tool_findings.first().map(|f| f.category.clone()).unwrap_or_else(|| "general".to_string())
                        };
                        let filename = artifact_filename(service, &category, tool);
                        tracing::debug!(%service, %tool, %filename, "extracting tool payload to sarif artifact");
                        let bytes = serde_json::to_vec_pretty(payload).unwrap_or_default();
                        artifacts.insert(filename.clone(), bytes);
                        Some(format!("sarif/{filename}"))
                    } else {
                        None
                    };

                    let total_issues = tool_findings.len();
                    tools.insert(
                        tool.clone(),
                        ToolEntry {
                            status: if total_issues > 0 { "success".to_string() } else { "no_issues".to_string() },
                            total_issues,
                            severity_counts,
                            artifact_ref,
                        },
                    );
                    findings.extend(tool_findings);
                }

                services.insert(
                    service,
                    match response.status {
                        ResponseStatus::NoIssues => ServiceEntry::NoIssues,
                        _ => ServiceEntry::Success,
                    },
                );
            }
        }
    }

    sort_findings(&mut findings);

    let terminal_status = if input.cancelled {
        TaskStatus::Cancelled
    } else if attempted_errored == 0 {
        TaskStatus::Completed
    } else if attempted_succeeded > 0 {
        TaskStatus::PartialSuccess
    } else {
        TaskStatus::Failed
    };

    let summary = Summary::from_findings(&findings, attempted_succeeded, tools.len());
    let duration_ms = input.completed_at_ms.saturating_sub(input.started_at_ms.unwrap_or(input.created_at_ms));

    let result = AggregatedResult {
        metadata: AggregateMetadata {
            task_id: input.task_id,
            target_model: input.target_model,
            target_app_number: input.target_app_number,
            created_at_ms: input.created_at_ms,
            started_at_ms: input.started_at_ms,
            completed_at_ms: Some(input.completed_at_ms),
            duration_ms,
        },
        services,
        tools,
        findings,
        summary,
        errors,
    };

    AggregationOutput { result, terminal_status, artifacts, service_snapshots }
}

fn artifact_filename(service: ServiceKind, category: &str, tool: &str) -> String {
    format!("{service}_{category}_{tool}.sarif.json")
}

fn is_sarif_shaped(payload: &serde_json::Value) -> bool {
    payload.get("runs").is_some_and(|v| v.is_array())
}

fn needs_extraction(payload: &serde_json::Value, threshold_bytes: usize) -> bool {
    is_sarif_shaped(payload)
        || serde_json::to_vec(payload).map(|b| b.len() > threshold_bytes).unwrap_or(false)
}

/// Pull normalized findings out of a tool's raw payload. Two shapes are
/// understood: a `{"findings": [...]}` envelope the tool emits directly in
/// our normalized-ish vocabulary, and a SARIF document (`{"runs": [...]}`),
/// preferred over free-form output when both could apply (spec §4.5).
fn extract_findings(service: ServiceKind, tool: &str, payload: &serde_json::Value) -> Vec<Finding> {
    if is_sarif_shaped(payload) {
        return findings_from_sarif(service, tool, payload);
    }
    if let Some(items) = payload.get("findings").and_then(|v| v.as_array()) {
        return items.iter().map(|item| finding_from_json(service, tool, item)).collect();
    }
    Vec::new()
}

fn finding_from_json(service: ServiceKind, tool: &str, item: &serde_json::Value) -> Finding {
    let rule_id = item.get("rule_id").and_then(|v| v.as_str()).map(str::to_string);
    let native_severity = item.get("severity").and_then(|v| v.as_str());
    let severity = normalize_severity(tool, rule_id.as_deref(), native_severity);

    Finding {
        tool: tool.to_string(),
        service: service.to_string(),
        severity,
        category: item.get("category").and_then(|v| v.as_str()).unwrap_or("general").to_string(),
        message: item.get("message").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        file: item.get("file").and_then(|v| v.as_str()).map(str::to_string),
        line: item.get("line").and_then(|v| v.as_u64()).map(|n| n as u32),
        column: item.get("column").and_then(|v| v.as_u64()).map(|n| n as u32),
        rule_id,
        raw: Some(item.clone()),
    }
}

fn findings_from_sarif(service: ServiceKind, tool: &str, payload: &serde_json::Value) -> Vec<Finding> {
    let mut out = Vec::new();
    let Some(runs) = payload.get("runs").and_then(|v| v.as_array()) else { return out };

    for run in runs {
        let Some(results) = run.get("results").and_then(|v| v.as_array()) else { continue };
        for result in results {
            let rule_id = result.get("ruleId").and_then(|v| v.as_str()).map(str::to_string);
            let native_level = result.get("level").and_then(|v| v.as_str());
            let severity = normalize_severity(tool, rule_id.as_deref(), native_level.or(Some("warning")));

            let message =
                result.get("message").and_then(|m| m.get("text")).and_then(|v| v.as_str()).unwrap_or_default();

            let location = result
                .get("locations")
                .and_then(|v| v.as_array())
                .and_then(|locs| locs.first())
                .and_then(|loc| loc.get("physicalLocation"));
            let file = location
                .and_then(|l| l.get("artifactLocation"))
                .and_then(|a| a.get("uri"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let region = location.and_then(|l| l.get("region"));
            let line = region.and_then(|r| r.get("startLine")).and_then(|v| v.as_u64()).map(|n| n as u32);
            let column = region.and_then(|r| r.get("startColumn")).and_then(|v| v.as_u64()).map(|n| n as u32);

            out.push(Finding {
                tool: tool.to_string(),
                service: service.to_string(),
                severity,
                category: "sarif".to_string(),
                message: message.to_string(),
                file,
                line,
                column,
                rule_id,
                raw: Some(result.clone()),
            });
        }
    }
    out
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
