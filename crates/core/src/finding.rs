// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized finding shape (spec §3) shared by every analyzer service.

use serde::{Deserialize, Serialize};

/// Normalized severity. Native tool severities are remapped onto this closed
/// set by the aggregator (spec §4.5) — this crate only defines the target
/// vocabulary and its ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::High, Severity::Medium, Severity::Low, Severity::Info];
}

/// A single normalized finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub tool: String,
    pub service: String,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Original, un-remapped tool output for this finding (best-effort).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Finding {
    /// Sort key used to make aggregated documents deterministic regardless
    /// of the wall-clock order in which services complete (spec §5,
    /// invariant 8): `(service, tool, file, line, rule_id)`.
    pub fn sort_key(&self) -> (&str, &str, &str, u32, &str) {
        (
            self.service.as_str(),
            self.tool.as_str(),
            self.file.as_deref().unwrap_or(""),
            self.line.unwrap_or(0),
            self.rule_id.as_deref().unwrap_or(""),
        )
    }
}

/// Sort findings in place by the deterministic key (spec §5).
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
#[path = "finding_tests.rs"]
mod tests;
