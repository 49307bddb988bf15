// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error-kind taxonomy shared across the engine (spec §7).
//!
//! Every crate in the workspace eventually maps its own `thiserror` error
//! type onto one of these kinds at the Dispatcher boundary, so the terminal
//! `error_message` and status derivation logic only ever has to reason
//! about this fixed set.

use serde::{Deserialize, Serialize};

/// The closed set of error kinds the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad task submission.
    Validation,
    /// Target app does not exist under any slug variant.
    NotFound,
    /// Endpoints required but absent (dynamic/performance without ports).
    NoPorts,
    /// Analyzer service unreachable.
    Unreachable,
    /// Connection established but handshake/health probe failed.
    HandshakeFailed,
    /// Analyzer call exceeded its deadline.
    Timeout,
    /// Framing/parsing failure on the wire.
    ProtocolError,
    /// The analyzer worker itself reported failure.
    RemoteError,
    /// Operation was cancelled.
    Cancelled,
    /// Task's total deadline budget was exceeded.
    DeadlineExceeded,
    /// Writing the aggregated result or manifest failed.
    PersistenceError,
    /// Uncaught/unexpected error.
    Internal,
}

crate::simple_display! {
    ErrorKind {
        Validation => "validation",
        NotFound => "not_found",
        NoPorts => "no_ports",
        Unreachable => "unreachable",
        HandshakeFailed => "handshake_failed",
        Timeout => "timeout",
        ProtocolError => "protocol_error",
        RemoteError => "remote_error",
        Cancelled => "cancelled",
        DeadlineExceeded => "deadline_exceeded",
        PersistenceError => "persistence_error",
        Internal => "internal",
    }
}

/// A generic engine error: a kind plus a human-readable message.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn no_ports(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoPorts, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}
