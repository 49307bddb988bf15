// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter-local error type, mapped onto [`orch_core::ErrorKind`] at the
//! dispatcher boundary (spec §7).

use orch_core::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection to {addr} failed: {source}")]
    Unreachable { addr: String, #[source] source: std::io::Error },

    #[error("circuit breaker open for {addr}, retry after cooldown")]
    BreakerOpen { addr: String },

    #[error("health probe for {addr} failed: {reason}")]
    HandshakeFailed { addr: String, reason: String },

    #[error("analyze call to {addr} exceeded its deadline")]
    Timeout { addr: String },

    #[error("protocol error on {addr}: {source}")]
    Protocol { addr: String, #[source] source: orch_wire::ProtocolError },

    #[error("worker at {addr} reported failure: {message}")]
    RemoteError { addr: String, message: String },

    #[error("analyze call to {addr} was cancelled")]
    Cancelled { addr: String },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Unreachable { .. } | ClientError::BreakerOpen { .. } => ErrorKind::Unreachable,
            ClientError::HandshakeFailed { .. } => ErrorKind::HandshakeFailed,
            ClientError::Timeout { .. } => ErrorKind::Timeout,
            ClientError::Protocol { .. } => ErrorKind::ProtocolError,
            ClientError::RemoteError { .. } => ErrorKind::RemoteError,
            ClientError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether this outcome should count against the circuit breaker
    /// (spec §4.4: `remote_error` does not trip the breaker — a worker that
    /// reliably reports failures is still considered live).
    pub fn trips_breaker(&self) -> bool {
        matches!(
            self,
            ClientError::Unreachable { .. } | ClientError::HandshakeFailed { .. } | ClientError::Timeout { .. }
        )
    }
}
