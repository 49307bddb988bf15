// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher's worker-group abstraction (spec §4.6, §9 REDESIGN
//! FLAGS: "the underlying requirement is any correct concurrent executor
//! bounded by worker_parallelism"). `TokioExecutor` is the one in-process
//! implementation; the trait seam exists so a remote-broker implementation
//! could be added without touching the dispatcher's control flow.

use std::future::Future;
use std::pin::Pin;

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs a batch of jobs to completion, at most `parallelism` concurrently.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    async fn run_all(&self, jobs: Vec<BoxedJob>);
}

/// Bounded `tokio::task::JoinSet`-backed executor (spec §9).
pub struct TokioExecutor {
    parallelism: usize,
}

impl TokioExecutor {
    pub fn new(parallelism: usize) -> Self {
        Self { parallelism: parallelism.max(1) }
    }
}

#[async_trait::async_trait]
impl Executor for TokioExecutor {
    async fn run_all(&self, jobs: Vec<BoxedJob>) {
        let mut pending = jobs.into_iter();
        let mut set = tokio::task::JoinSet::new();

        for job in pending.by_ref().take(self.parallelism) {
            set.spawn(job);
        }

        while set.join_next().await.is_some() {
            if let Some(job) = pending.next() {
                set.spawn(job);
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
