// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Severity normalization (spec §4.5): maps tool-native severity/rule
//! vocabulary onto the closed `{high, medium, low, info}` set.
//!
//! A static, reviewable table rather than scattered per-tool conditionals
//! (spec §9 REDESIGN FLAGS). Entries are `(tool_prefix, rule_prefix,
//! severity)`; the first matching entry wins, falling back to the tool's
//! default when no rule prefix matches.

use orch_core::Severity;

/// `(tool_prefix, rule_prefix, severity)`. `tool_prefix`/`rule_prefix` of
/// `""` match anything, so a row with an empty `rule_prefix` acts as that
/// tool's default.
const TABLE: &[(&str, &str, Severity)] = &[
    // Cosmetic/whitespace rules normalize down regardless of native level.
    ("", "whitespace", Severity::Info),
    ("", "trailing-whitespace", Severity::Info),
    ("", "missing-eof-newline", Severity::Info),
    ("", "W291", Severity::Info),
    ("", "W292", Severity::Info),
    ("", "W293", Severity::Info),
    // Security/undefined-symbol classes always map high.
    ("bandit", "B3", Severity::High),
    ("bandit", "B6", Severity::High),
    ("semgrep", "security", Severity::High),
    ("eslint", "no-undef", Severity::High),
    ("", "sql-injection", Severity::High),
    ("", "xss", Severity::High),
    // Per-tool stylistic defaults.
    ("eslint", "", Severity::Medium),
    ("pylint", "", Severity::Medium),
    ("ruff", "", Severity::Medium),
];

/// Normalize a tool's native severity token plus rule id into the closed
/// severity set. `native` is consulted only when nothing in the table
/// matches and no per-tool default exists either — it is the last resort,
/// not the primary signal, since native scales differ wildly across tools.
pub fn normalize_severity(tool: &str, rule_id: Option<&str>, native: Option<&str>) -> Severity {
    if let Some(rule_id) = rule_id {
        for &(tool_prefix, rule_prefix, severity) in TABLE {
            if (tool_prefix.is_empty() || tool.starts_with(tool_prefix))
                && !rule_prefix.is_empty()
                && rule_id.starts_with(rule_prefix)
            {
                return severity;
            }
        }
    }

    for &(tool_prefix, rule_prefix, severity) in TABLE {
        if rule_prefix.is_empty() && tool.starts_with(tool_prefix) && !tool_prefix.is_empty() {
            return severity;
        }
    }

    match native.map(str::to_ascii_lowercase).as_deref() {
        Some("critical" | "error" | "high") => Severity::High,
        Some("medium" | "warning" | "warn") => Severity::Medium,
        Some("low") => Severity::Low,
        _ => Severity::Info,
    }
}

#[cfg(test)]
#[path = "severity_tests.rs"]
mod tests;
