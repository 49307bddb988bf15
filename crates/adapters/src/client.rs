// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `AnalyzerClient` trait and its TCP implementation (spec §4.3).

use crate::breaker::CircuitBreaker;
use crate::error::ClientError;
use crate::health::HealthCache;
use crate::pool::ConnectionPool;
use orch_core::Clock;
use orch_wire::{decode, encode, read_message, write_message, AnalyzerRequest, AnalyzerResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The per-service-kind analyzer transport. One implementation per
/// configured endpoint; the dispatcher holds one per `ServiceKind` it
/// dispatches to.
#[async_trait::async_trait]
pub trait AnalyzerClient: Send + Sync {
    async fn analyze(
        &self,
        request: AnalyzerRequest,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Result<AnalyzerResponse, ClientError>;

    async fn health(&self) -> Result<(), ClientError>;
}

/// TCP-backed analyzer client: pooled connections, length-prefixed JSON
/// framing, a per-client circuit breaker, and a TTL-cached health probe.
///
/// The worker does not close the channel; only this client does, after
/// fully receiving the response (spec §4.3).
pub struct TcpAnalyzerClient<C: Clock> {
    addr: String,
    pool: Arc<ConnectionPool>,
    breaker: CircuitBreaker,
    health: HealthCache,
    clock: C,
}

impl<C: Clock> TcpAnalyzerClient<C> {
    pub fn new(
        addr: impl Into<String>,
        max_pool_size: usize,
        breaker_threshold: u32,
        breaker_cooldown: Duration,
        breaker_cooldown_cap: Duration,
        health_ttl: Duration,
        clock: C,
    ) -> Self {
        let addr = addr.into();
        Self {
            pool: ConnectionPool::new(addr.clone(), max_pool_size),
            breaker: CircuitBreaker::new(breaker_threshold, breaker_cooldown, breaker_cooldown_cap),
            health: HealthCache::new(health_ttl),
            addr,
            clock,
        }
    }
}

#[async_trait::async_trait]
impl<C: Clock> AnalyzerClient for TcpAnalyzerClient<C> {
    async fn analyze(
        &self,
        request: AnalyzerRequest,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Result<AnalyzerResponse, ClientError> {
        let permit = self
            .breaker
            .try_acquire(&self.clock)
            .ok_or_else(|| ClientError::BreakerOpen { addr: self.addr.clone() })?;

        let outcome = tokio::select! {
            result = self.run_analyze(request) => result,
            _ = cancel.cancelled() => Err(ClientError::Cancelled { addr: self.addr.clone() }),
            _ = tokio::time::sleep(deadline) => Err(ClientError::Timeout { addr: self.addr.clone() }),
        };

        match &outcome {
            Ok(_) => self.breaker.on_success(permit),
            Err(e) if e.trips_breaker() => self.breaker.on_failure(permit, &self.clock),
            Err(_) => self.breaker.release_without_counting(permit),
        }

        outcome
    }

    async fn health(&self) -> Result<(), ClientError> {
        if let Some(true) = self.health.get(&self.clock) {
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        let probe = AnalyzerRequest::StaticAnalyze {
            request_id: "health".into(),
            model: String::new(),
            app_number: 0,
            source_dir: String::new(),
            tools: Vec::new(),
            options: Default::default(),
        };
        let bytes = encode(&probe).map_err(|source| ClientError::Protocol { addr: self.addr.clone(), source })?;
        let result = write_message(conn.stream_mut(), &bytes).await;

        match result {
            Ok(()) => {
                self.health.record(true, &self.clock);
                conn.release_healthy();
                Ok(())
            }
            Err(_) => {
                self.health.record(false, &self.clock);
                conn.discard();
                Err(ClientError::HandshakeFailed { addr: self.addr.clone(), reason: "probe write failed".into() })
            }
        }
    }
}

impl<C: Clock> TcpAnalyzerClient<C> {
    async fn run_analyze(&self, request: AnalyzerRequest) -> Result<AnalyzerResponse, ClientError> {
        let mut conn = self.pool.acquire().await?;

        let out = encode(&request).map_err(|source| ClientError::Protocol { addr: self.addr.clone(), source })?;
        if let Err(source) = write_message(conn.stream_mut(), &out).await {
            conn.discard();
            return Err(ClientError::Protocol { addr: self.addr.clone(), source });
        }

        let raw = match read_message(conn.stream_mut()).await {
            Ok(raw) => raw,
            Err(source) => {
                conn.discard();
                return Err(ClientError::Protocol { addr: self.addr.clone(), source });
            }
        };

        let response: AnalyzerResponse = match decode(&raw) {
            Ok(r) => r,
            Err(source) => {
                conn.discard();
                return Err(ClientError::Protocol { addr: self.addr.clone(), source });
            }
        };

        conn.release_healthy();

        if response.status == orch_wire::ResponseStatus::Error {
            return Err(ClientError::RemoteError {
                addr: self.addr.clone(),
                message: response.error.clone().unwrap_or_default(),
            });
        }

        Ok(response)
    }
}

#[cfg(feature = "test-support")]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// An in-memory `AnalyzerClient` double for dispatcher/engine tests.
    pub struct FakeAnalyzerClient {
        responses: Mutex<std::collections::VecDeque<Result<AnalyzerResponse, ClientError>>>,
    }

    impl FakeAnalyzerClient {
        pub fn new(responses: Vec<Result<AnalyzerResponse, ClientError>>) -> Self {
            Self { responses: Mutex::new(responses.into()) }
        }
    }

    #[async_trait::async_trait]
    impl AnalyzerClient for FakeAnalyzerClient {
        async fn analyze(
            &self,
            request: AnalyzerRequest,
            _deadline: Duration,
            _cancel: CancellationToken,
        ) -> Result<AnalyzerResponse, ClientError> {
            self.responses.lock().pop_front().unwrap_or_else(|| {
                Ok(AnalyzerResponse::no_issues(request.request_id().clone()))
            })
        }

        async fn health(&self) -> Result<(), ClientError> {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
