// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher↔worker wire DTOs (spec §6.2).

use orch_core::ServiceKind;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap};

/// Opaque request correlation id. The worker echoes this back verbatim on
/// its matching response.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(SmolStr);

impl RequestId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Dispatcher → worker message. Variant names match the `type` field values
/// in spec §6.2 (`static_analyze`, `dynamic_analyze`, `performance_test`,
/// `ai_analyze`). Each variant carries its own `request_id`, matching the
/// duplicated-per-variant field style used for correlating fields in the
/// corpus's own query/response protocol enums.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AnalyzerRequest {
    #[serde(rename = "static_analyze")]
    StaticAnalyze {
        request_id: RequestId,
        model: String,
        app_number: u32,
        source_dir: String,
        tools: Vec<String>,
        #[serde(default)]
        options: HashMap<String, serde_json::Value>,
    },
    #[serde(rename = "dynamic_analyze")]
    DynamicAnalyze {
        request_id: RequestId,
        model: String,
        app_number: u32,
        source_dir: String,
        target_urls: Vec<String>,
        tools: Vec<String>,
        #[serde(default)]
        options: HashMap<String, serde_json::Value>,
    },
    #[serde(rename = "performance_test")]
    PerformanceTest {
        request_id: RequestId,
        model: String,
        app_number: u32,
        source_dir: String,
        target_urls: Vec<String>,
        tools: Vec<String>,
        #[serde(default)]
        options: HashMap<String, serde_json::Value>,
    },
    #[serde(rename = "ai_analyze")]
    AiAnalyze {
        request_id: RequestId,
        model: String,
        app_number: u32,
        source_dir: String,
        tools: Vec<String>,
        #[serde(default)]
        options: HashMap<String, serde_json::Value>,
    },
}

impl AnalyzerRequest {
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::StaticAnalyze { request_id, .. }
            | Self::DynamicAnalyze { request_id, .. }
            | Self::PerformanceTest { request_id, .. }
            | Self::AiAnalyze { request_id, .. } => request_id,
        }
    }

    pub fn tools(&self) -> &[String] {
        match self {
            Self::StaticAnalyze { tools, .. }
            | Self::DynamicAnalyze { tools, .. }
            | Self::PerformanceTest { tools, .. }
            | Self::AiAnalyze { tools, .. } => tools,
        }
    }

    pub fn service_kind(&self) -> ServiceKind {
        match self {
            Self::StaticAnalyze { .. } => ServiceKind::Static,
            Self::DynamicAnalyze { .. } => ServiceKind::Dynamic,
            Self::PerformanceTest { .. } => ServiceKind::Performance,
            Self::AiAnalyze { .. } => ServiceKind::Ai,
        }
    }
}

/// Per-(model, app_number) overall outcome a worker reports for an
/// `analyze` call (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    NoIssues,
    Error,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResponseStatus::Success => "success",
            ResponseStatus::NoIssues => "no_issues",
            ResponseStatus::Error => "error",
        })
    }
}

/// Worker → dispatcher response for an `analyze` call. Exactly one of
/// these is sent per request, matching `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerResponse {
    pub request_id: RequestId,
    pub status: ResponseStatus,
    /// Tool-indexed raw result payloads, in the order the worker ran them.
    #[serde(default)]
    pub results: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerResponse {
    pub fn success(request_id: RequestId, results: BTreeMap<String, serde_json::Value>) -> Self {
        Self { request_id, status: ResponseStatus::Success, results, error: None }
    }

    pub fn no_issues(request_id: RequestId) -> Self {
        Self { request_id, status: ResponseStatus::NoIssues, results: BTreeMap::new(), error: None }
    }

    pub fn error(request_id: RequestId, error: impl Into<String>) -> Self {
        Self { request_id, status: ResponseStatus::Error, results: BTreeMap::new(), error: Some(error.into()) }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
