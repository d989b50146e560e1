// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution span of a query

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::Span;
use uuid::Uuid;

/// Tracing span covering a query from plan execution to completion
#[derive(Debug)]
pub struct ExecutionSpan {
    span: Span,
    started: Instant,
    elapsed: Mutex<Option<Duration>>,
}

impl ExecutionSpan {
    pub fn start(query_id: Uuid) -> Self {
        let span = tracing::info_span!(
            "execute",
            query_id = %query_id,
            elapsed_ms = tracing::field::Empty
        );
        Self {
            span,
            started: Instant::now(),
            elapsed: Mutex::new(None),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Record the elapsed time. Only the first call has an effect; later
    /// calls return `None`.
    pub fn finish(&self) -> Option<Duration> {
        let mut elapsed = self.elapsed.lock();
        if elapsed.is_some() {
            return None;
        }
        let took = self.started.elapsed();
        self.span.record("elapsed_ms", took.as_millis() as u64);
        *elapsed = Some(took);
        Some(took)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed.lock().is_some()
    }

    /// Time between start and finish, if finished
    pub fn elapsed(&self) -> Option<Duration> {
        *self.elapsed.lock()
    }
}
