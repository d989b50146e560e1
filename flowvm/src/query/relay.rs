// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relay tasks feeding a query handle
//!
//! Two tasks run per query. The result relay hands the executor's named
//! results to the consumer one at a time and stops at cancellation. A result
//! counts as relayed only once the consumer has taken it off the stream. The
//! metadata relay merges every metadata batch into the query statistics until
//! the executor closes its stream.

use crate::exec::{ExecutionError, Metadata, QueryResult, Statistics};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// State shared between a query handle and its relays
#[derive(Debug, Default)]
pub(crate) struct QueryState {
    pub(crate) stats: Mutex<Statistics>,
    err: Mutex<Option<ExecutionError>>,
}

impl QueryState {
    pub(crate) fn new(stats: Statistics) -> Self {
        Self {
            stats: Mutex::new(stats),
            err: Mutex::new(None),
        }
    }

    /// Record the terminal error unless one is already set
    pub(crate) fn fail(&self, err: ExecutionError) {
        let mut slot = self.err.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn err(&self) -> Option<ExecutionError> {
        self.err.lock().clone()
    }
}

/// A result offered to the consumer, and the ack the relay waits on
#[derive(Debug)]
pub(crate) struct Delivery {
    result: QueryResult,
    ack: oneshot::Sender<()>,
}

/// Public side of the result relay.
///
/// A result the relay gave up on (because the query was cancelled while
/// the result was waiting) is discarded instead of returned.
#[derive(Debug)]
pub struct ResultStream {
    rx: mpsc::Receiver<Delivery>,
}

impl ResultStream {
    pub(crate) fn channel() -> (mpsc::Sender<Delivery>, Self) {
        let (tx, rx) = mpsc::channel(1);
        (tx, Self { rx })
    }

    /// Next result, or `None` once every result is taken or the relay stopped
    pub async fn recv(&mut self) -> Option<QueryResult> {
        loop {
            let Delivery { result, ack } = self.rx.recv().await?;
            if ack.send(()).is_ok() {
                return Some(result);
            }
            log::debug!("discarding result {} withdrawn by relay", result.name());
        }
    }
}

/// Offer results in name order, waiting for the consumer to take each one.
/// The public stream closes when this returns, because `tx` is dropped on
/// every path.
pub(crate) async fn relay_results(
    token: CancellationToken,
    results: BTreeMap<String, QueryResult>,
    tx: mpsc::Sender<Delivery>,
    state: Arc<QueryState>,
) {
    for (name, result) in results {
        let (ack, taken) = oneshot::channel();
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                log::debug!("result relay canceled before {}", name);
                state.fail(ExecutionError::Canceled);
                return;
            }

            sent = tx.send(Delivery { result, ack }) => if sent.is_err() {
                log::debug!("result stream closed by consumer");
                return;
            }
        }

        tokio::select! {
            biased;

            _ = token.cancelled() => {
                log::debug!("result relay canceled before {} was taken", name);
                state.fail(ExecutionError::Canceled);
                return;
            }

            taken = taken => if taken.is_err() {
                log::debug!("result stream dropped before {} was taken", name);
                return;
            }
        }
    }
}

/// Merge metadata until the executor's stream ends
pub(crate) async fn relay_metadata(
    mut rx: mpsc::Receiver<Metadata>,
    state: Arc<QueryState>,
) {
    while let Some(md) = rx.recv().await {
        state.stats.lock().metadata.add_all(&md);
    }
}
