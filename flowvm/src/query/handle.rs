// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Live query handle
//!
//! A [`Query`] exists once its physical plan has started executing. It owns
//! the public result stream, the statistics the metadata relay fills in, the
//! cancel trigger, and the two relay tasks. `done` must be awaited to
//! release it cleanly; dropping an unfinished query cancels it.

use crate::exec::{ExecutionError, MemoryAllocator, Metadata, QueryResult, Statistics};
use crate::query::cancel::CancelTrigger;
use crate::query::relay::{relay_metadata, relay_results, QueryState, ResultStream};
use crate::query::span::ExecutionSpan;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

pub struct Query {
    id: Uuid,
    results: ResultStream,
    state: Arc<QueryState>,
    alloc: Arc<MemoryAllocator>,
    cancel: CancelTrigger,
    span: ExecutionSpan,
    relays: Option<(JoinHandle<()>, JoinHandle<()>)>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .field("err", &self.state.err())
            .finish()
    }
}

/// Everything needed to start relaying an executing plan
pub(crate) struct QueryParts {
    pub id: Uuid,
    pub token: CancellationToken,
    pub results: BTreeMap<String, QueryResult>,
    pub metadata: mpsc::Receiver<Metadata>,
    pub statistics: Statistics,
    pub alloc: Arc<MemoryAllocator>,
    pub span: ExecutionSpan,
}

impl Query {
    /// Spawn both relay tasks on the current runtime and return the handle
    pub(crate) fn start(parts: QueryParts) -> Self {
        let QueryParts {
            id,
            token,
            results,
            metadata,
            statistics,
            alloc,
            span,
        } = parts;

        let (tx, rx) = ResultStream::channel();
        let state = Arc::new(QueryState::new(statistics));

        let results_relay = tokio::spawn(
            relay_results(token.clone(), results, tx, state.clone()).instrument(span.span().clone()),
        );
        let metadata_relay =
            tokio::spawn(relay_metadata(metadata, state.clone()).instrument(span.span().clone()));

        Self {
            id,
            results: rx,
            state,
            alloc,
            cancel: CancelTrigger::armed(token),
            span,
            relays: Some((results_relay, metadata_relay)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The public result stream; closes once every result is taken or the
    /// query is cancelled. A result not yet taken when the query is
    /// cancelled is never delivered.
    pub fn results(&mut self) -> &mut ResultStream {
        &mut self.results
    }

    pub async fn next_result(&mut self) -> Option<QueryResult> {
        self.results.recv().await
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            log::debug!("query {} cancel requested", self.id);
        }
    }

    /// The trigger `cancel` fires, for sharing with signal handlers
    pub fn cancel_trigger(&self) -> CancelTrigger {
        self.cancel.clone()
    }

    /// Cancel, wait for both relays, then finalize statistics.
    ///
    /// Only the first call does anything.
    pub async fn done(&mut self) {
        let Some((results_relay, metadata_relay)) = self.relays.take() else {
            return;
        };
        self.cancel();

        let (results, metadata) = tokio::join!(results_relay, metadata_relay);
        for (relay, outcome) in [("result", results), ("metadata", metadata)] {
            if let Err(e) = outcome {
                log::error!("query {} {} relay failed: {}", self.id, relay, e);
                self.state
                    .fail(ExecutionError::Internal(format!("{} relay failed: {}", relay, e)));
            }
        }

        {
            let mut stats = self.state.stats.lock();
            stats.max_allocated = self.alloc.max_allocated();
            stats.total_allocated = self.alloc.total_allocated();
        }
        if let Some(elapsed) = self.span.finish() {
            log::debug!("query {} done in {:?}", self.id, elapsed);
        }
    }

    pub fn is_done(&self) -> bool {
        self.relays.is_none()
    }

    /// Terminal error, if any
    pub fn err(&self) -> Option<ExecutionError> {
        self.state.err()
    }

    pub fn statistics(&self) -> Statistics {
        self.state.stats.lock().clone()
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        if self.relays.is_some() {
            log::warn!("query {} dropped before done; cancelling", self.id);
            self.cancel.cancel();
        }
    }
}
