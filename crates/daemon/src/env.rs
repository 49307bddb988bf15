// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate (spec
//! §6.4): one documented accessor per variable, with defaults, following
//! the corpus's `daemon::env` convention.

use orch_core::ServiceKind;
use std::path::PathBuf;
use std::time::Duration;

/// Results root directory (`ORCH_RESULTS_ROOT`, default `./results`).
pub fn results_root() -> PathBuf {
    std::env::var("ORCH_RESULTS_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./results"))
}

/// Root directory the App Locator resolves target apps under
/// (`ORCH_APPS_ROOT`, default `./apps`). Not itself part of spec.md's core
/// env var list but required to construct the locator.
pub fn apps_root() -> PathBuf {
    std::env::var("ORCH_APPS_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./apps"))
}

/// `host:port` to listen on for task submissions (`ORCH_SUBMIT_ADDR`,
/// default `127.0.0.1:7420`).
pub fn submit_addr() -> String {
    std::env::var("ORCH_SUBMIT_ADDR").unwrap_or_else(|_| "127.0.0.1:7420".to_string())
}

/// Per-service endpoint address (`ORCH_STATIC_ADDR`, `ORCH_DYNAMIC_ADDR`,
/// `ORCH_PERFORMANCE_ADDR`, `ORCH_AI_ADDR`). `None` means the service kind
/// has no configured worker and is never dispatched to.
pub fn service_addr(service: ServiceKind) -> Option<String> {
    std::env::var(addr_var(service)).ok().filter(|s| !s.is_empty())
}

/// Per-service analyze deadline (`ORCH_STATIC_TIMEOUT_MS`, etc), falling
/// back to [`ServiceKind::default_timeout`] (spec §4.3).
pub fn service_timeout(service: ServiceKind) -> Duration {
    std::env::var(timeout_var(service))
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| service.default_timeout())
}

fn addr_var(service: ServiceKind) -> &'static str {
    match service {
        ServiceKind::Static => "ORCH_STATIC_ADDR",
        ServiceKind::Dynamic => "ORCH_DYNAMIC_ADDR",
        ServiceKind::Performance => "ORCH_PERFORMANCE_ADDR",
        ServiceKind::Ai => "ORCH_AI_ADDR",
    }
}

fn timeout_var(service: ServiceKind) -> &'static str {
    match service {
        ServiceKind::Static => "ORCH_STATIC_TIMEOUT_MS",
        ServiceKind::Dynamic => "ORCH_DYNAMIC_TIMEOUT_MS",
        ServiceKind::Performance => "ORCH_PERFORMANCE_TIMEOUT_MS",
        ServiceKind::Ai => "ORCH_AI_TIMEOUT_MS",
    }
}

/// Per-service connection pool size (`ORCH_POOL_SIZE`, default 4).
pub fn pool_size() -> usize {
    std::env::var("ORCH_POOL_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(4)
}

/// Dispatcher worker-group size (`ORCH_WORKER_PARALLELISM`, default 4).
pub fn worker_parallelism() -> usize {
    std::env::var("ORCH_WORKER_PARALLELISM").ok().and_then(|s| s.parse().ok()).unwrap_or(4)
}

/// Circuit breaker trip threshold (`ORCH_BREAKER_THRESHOLD`, default 5).
pub fn breaker_threshold() -> u32 {
    std::env::var("ORCH_BREAKER_THRESHOLD").ok().and_then(|s| s.parse().ok()).unwrap_or(5)
}

/// Circuit breaker base cooldown (`ORCH_BREAKER_COOLDOWN_MS`, default
/// 30000ms). Doubles on repeated half-open failure, capped at
/// [`BREAKER_COOLDOWN_CAP`].
pub fn breaker_cooldown() -> Duration {
    std::env::var("ORCH_BREAKER_COOLDOWN_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_secs(30))
}

/// Hard cap on breaker cooldown doubling (spec §9 Open Question
/// resolution): 5 minutes, not independently configurable.
pub const BREAKER_COOLDOWN_CAP: Duration = Duration::from_secs(300);

/// Health probe cache TTL (`ORCH_HEALTH_PROBE_TTL_MS`, default 10000ms).
pub fn health_probe_ttl() -> Duration {
    std::env::var("ORCH_HEALTH_PROBE_TTL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_secs(10))
}

/// Informational retention window in days (`ORCH_RETENTION_DAYS`); read
/// but never acted on — retention itself is out of scope (spec §1, §6.4).
pub fn retention_days() -> Option<u64> {
    std::env::var("ORCH_RETENTION_DAYS").ok().and_then(|s| s.parse().ok())
}

/// Lease-expiry sweep cadence (`ORCH_LEASE_SWEEP_MS`, default 2000ms).
pub fn lease_sweep_interval() -> Duration {
    std::env::var("ORCH_LEASE_SWEEP_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(2000))
}

/// Size threshold above which a tool payload is extracted to a `sarif/`
/// artifact (`ORCH_ARTIFACT_THRESHOLD_BYTES`, default 32 KiB).
pub fn artifact_threshold_bytes() -> usize {
    std::env::var("ORCH_ARTIFACT_THRESHOLD_BYTES").ok().and_then(|s| s.parse().ok()).unwrap_or(32 * 1024)
}

/// Path the Task Store snapshots its table to for crash recovery
/// (`ORCH_STATE_DIR`/`snapshot.json`, default `./state/snapshot.json`).
pub fn snapshot_path() -> PathBuf {
    let dir = std::env::var("ORCH_STATE_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./state"));
    dir.join("snapshot.json")
}
