// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Analyzer service kinds, analysis types, and the static tool→service
//! registry used to compute `tools_by_service` (spec §3, §4.6 step 4).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// One of the four fixed analyzer service kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Static,
    Dynamic,
    Performance,
    Ai,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] =
        [ServiceKind::Static, ServiceKind::Dynamic, ServiceKind::Performance, ServiceKind::Ai];

    /// Default per-service analyzer call deadline (spec §4.3).
    pub fn default_timeout(self) -> Duration {
        match self {
            ServiceKind::Static => Duration::from_secs(300),
            ServiceKind::Dynamic => Duration::from_secs(900),
            ServiceKind::Performance => Duration::from_secs(900),
            ServiceKind::Ai => Duration::from_secs(600),
        }
    }

    /// Whether this service kind requires the target app to expose live
    /// endpoints (spec §4.2): "no synthetic port fallback is permitted".
    pub fn requires_ports(self) -> bool {
        matches!(self, ServiceKind::Dynamic | ServiceKind::Performance)
    }
}

crate::simple_display! {
    ServiceKind {
        Static => "static",
        Dynamic => "dynamic",
        Performance => "performance",
        Ai => "ai",
    }
}

/// A resolved pair of backend/frontend ports for a target app (spec §3).
/// Absence of this type entirely (not zero values) is what the App Locator
/// uses to signal "no port configuration" — there is no synthetic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub backend_port: u16,
    pub frontend_port: u16,
}

/// Analysis type requested by the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Static,
    Dynamic,
    Performance,
    Ai,
    Unified,
}

crate::simple_display! {
    AnalysisType {
        Static => "static",
        Dynamic => "dynamic",
        Performance => "performance",
        Ai => "ai",
        Unified => "unified",
    }
}

impl AnalysisType {
    /// The set of service kinds this analysis type may touch. `Unified`
    /// spans all four; single-type analyses touch exactly one.
    pub fn candidate_services(self) -> Vec<ServiceKind> {
        match self {
            AnalysisType::Static => vec![ServiceKind::Static],
            AnalysisType::Dynamic => vec![ServiceKind::Dynamic],
            AnalysisType::Performance => vec![ServiceKind::Performance],
            AnalysisType::Ai => vec![ServiceKind::Ai],
            AnalysisType::Unified => ServiceKind::ALL.to_vec(),
        }
    }
}

/// Static tool→service registry (spec §9 REDESIGN FLAGS: "a static,
/// reviewable table", here applied to tool routing rather than severity).
///
/// Tools not present in the table are treated as unroutable and dropped —
/// the dispatcher never guesses a service for an unknown tool name.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tool_service: BTreeMap<&'static str, ServiceKind>,
    defaults: BTreeMap<ServiceKind, BTreeSet<&'static str>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        use ServiceKind::*;
        let entries: &[(&str, ServiceKind)] = &[
            ("bandit", Static),
            ("ruff", Static),
            ("eslint", Static),
            ("semgrep", Static),
            ("mypy", Static),
            ("pylint", Static),
            ("zap", Dynamic),
            ("nikto", Dynamic),
            ("sqlmap", Dynamic),
            ("locust", Performance),
            ("k6", Performance),
            ("lighthouse", Performance),
            ("ai-review", Ai),
            ("ai-security-review", Ai),
        ];

        let mut tool_service = BTreeMap::new();
        let mut defaults: BTreeMap<ServiceKind, BTreeSet<&'static str>> = BTreeMap::new();
        for &(tool, service) in entries {
            tool_service.insert(tool, service);
            defaults.entry(service).or_default().insert(tool);
        }

        Self { tool_service, defaults }
    }
}

impl ToolRegistry {
    pub fn service_for(&self, tool: &str) -> Option<ServiceKind> {
        self.tool_service.get(tool).copied()
    }

    /// Default tool set for a service when the submitter requested none
    /// ("empty = all default for type", spec §3).
    pub fn defaults_for(&self, service: ServiceKind) -> BTreeSet<String> {
        self.defaults.get(&service).into_iter().flatten().map(|s| s.to_string()).collect()
    }

    /// Group requested tools by service, per spec §4.6 step 4. Unknown tool
    /// names are dropped (never invented a service to route them to). When
    /// `requested` is empty, every service gets its default tool set.
    pub fn group_by_service(
        &self,
        requested: &BTreeSet<String>,
        candidates: &[ServiceKind],
    ) -> BTreeMap<ServiceKind, BTreeSet<String>> {
        let mut grouped: BTreeMap<ServiceKind, BTreeSet<String>> = BTreeMap::new();

        if requested.is_empty() {
            for &service in candidates {
                let tools = self.defaults_for(service);
                if !tools.is_empty() {
                    grouped.insert(service, tools);
                }
            }
            return grouped;
        }

        for tool in requested {
            if let Some(service) = self.service_for(tool) {
                if candidates.contains(&service) {
                    grouped.entry(service).or_default().insert(tool.clone());
                }
            }
        }
        grouped
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
