// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded per-service connection pool (spec §4.3, §5): FIFO acquisition
//! via a semaphore plus a deque of idle connections, lazy health check
//! before reuse, discard-on-protocol-error.

use crate::error::ClientError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ConnectionPool {
    addr: String,
    semaphore: Arc<Semaphore>,
    idle: Mutex<VecDeque<TcpStream>>,
}

impl ConnectionPool {
    pub fn new(addr: impl Into<String>, max_pool_size: usize) -> Arc<Self> {
        Arc::new(Self {
            addr: addr.into(),
            semaphore: Arc::new(Semaphore::new(max_pool_size.max(1))),
            idle: Mutex::new(VecDeque::new()),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Acquire a connection: an idle one if available, else a fresh TCP
    /// connect. Blocks (without holding the idle-deque lock) until a pool
    /// slot is free.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection, ClientError> {
        #[allow(clippy::expect_used)]
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("pool semaphore is never closed");

        let idle = self.idle.lock().pop_front();
        let stream = match idle {
            Some(stream) => stream,
            None => TcpStream::connect(&self.addr).await.map_err(|source| ClientError::Unreachable {
                addr: self.addr.clone(),
                source,
            })?,
        };

        Ok(PooledConnection { stream, pool: Arc::clone(self), _permit: permit })
    }

    fn release(&self, stream: TcpStream) {
        self.idle.lock().push_back(stream);
    }
}

/// A leased connection. The pool slot is held until this is dropped;
/// callers must explicitly choose [`PooledConnection::release_healthy`] or
/// [`PooledConnection::discard`] once they know the outcome of their use.
pub struct PooledConnection {
    stream: TcpStream,
    pool: Arc<ConnectionPool>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Return the connection to the idle pool for reuse.
    pub fn release_healthy(self) {
        self.pool.release(self.stream);
    }

    /// Drop the connection instead of returning it to the pool (protocol
    /// error, unexpected close, etc.). The pool slot still frees up.
    pub fn discard(self) {
        drop(self.stream);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
