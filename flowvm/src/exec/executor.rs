// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical plan executor
//!
//! The executor turns a physical plan into named result streams. The
//! shipped [`DataflowExecutor`] spawns one producer task per result; each
//! producer walks its pipeline from source to yield, accounts every
//! intermediate table with the query's allocator and emits the final rows
//! in batches.

use crate::config::EngineConfig;
use crate::exec::context::ExecutionContext;
use crate::exec::error::{ExecutionError, Result};
use crate::exec::memory::MemoryAllocator;
use crate::exec::metadata::Metadata;
use crate::exec::result::QueryResult;
use crate::plan::{LimitSpec, PhysicalPlan, PhysicalProcedure};
use crate::values::{Record, Table, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Metadata key prefix under which producers report their row counts
pub const ROWS_PRODUCED_KEY: &str = "flowvm/rows-produced";

/// Column name of a value result's single-cell table
pub const VALUE_COLUMN: &str = "_value";

/// Result streams keyed by name, and the executor's metadata stream
pub type ExecutorOutput = (BTreeMap<String, QueryResult>, mpsc::Receiver<Metadata>);

/// Runs physical plans
///
/// Implementations must return promptly: long-running work belongs in
/// spawned tasks that stop once `ctx`'s token is cancelled. The metadata
/// stream must close once every producer has finished.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        ctx: &ExecutionContext,
        plan: &PhysicalPlan,
        alloc: Arc<MemoryAllocator>,
    ) -> Result<ExecutorOutput>;
}

/// Executor for linear source-to-yield pipelines
#[derive(Debug, Clone)]
pub struct DataflowExecutor {
    config: Arc<EngineConfig>,
}

impl Default for DataflowExecutor {
    fn default() -> Self {
        Self::new(Arc::new(EngineConfig::default()))
    }
}

impl DataflowExecutor {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }
}

impl Executor for DataflowExecutor {
    fn execute(
        &self,
        ctx: &ExecutionContext,
        plan: &PhysicalPlan,
        alloc: Arc<MemoryAllocator>,
    ) -> Result<ExecutorOutput> {
        let pipelines = compile(plan)?;
        let handle = Handle::try_current().map_err(|e| {
            ExecutionError::RuntimeError(format!("executor requires a tokio runtime: {}", e))
        })?;

        let (md_tx, md_rx) = mpsc::channel(self.config.metadata_buffer.max(1));
        let mut results = BTreeMap::new();

        for (name, stages) in pipelines {
            let (tx, rx) = mpsc::channel(self.config.table_buffer.max(1));
            results.insert(name.clone(), QueryResult::new(name.clone(), rx));
            let producer = Producer {
                name,
                token: ctx.token().clone(),
                alloc: alloc.clone(),
                tables: tx,
                metadata: md_tx.clone(),
            };
            handle.spawn(producer.run_pipeline(stages, self.config.batch_size.max(1)));
        }

        for value in &plan.values {
            let (tx, rx) = mpsc::channel(1);
            results.insert(value.name.clone(), QueryResult::new(value.name.clone(), rx));
            let producer = Producer {
                name: value.name.clone(),
                token: ctx.token().clone(),
                alloc: alloc.clone(),
                tables: tx,
                metadata: md_tx.clone(),
            };
            handle.spawn(producer.run_value(value.value.clone()));
        }

        log::debug!("executor started {} result producers", results.len());
        Ok((results, md_rx))
    }
}

/// Procedures of every yield's pipeline, source first.
///
/// Only single-input operations are supported: every non-source node needs
/// exactly one parent.
fn compile(plan: &PhysicalPlan) -> Result<Vec<(String, Vec<PhysicalProcedure>)>> {
    for ix in plan.graph.indices() {
        let Some(node) = plan.graph.node(ix) else {
            continue;
        };
        let inputs = plan.graph.parents(ix).len();
        match (node.procedure.is_source(), inputs) {
            (true, 0) | (false, 1) => {}
            (true, n) => {
                return Err(ExecutionError::UnsupportedOperator(format!(
                    "source {} cannot have inputs, found {}",
                    node.id, n
                )))
            }
            (false, 0) => {
                return Err(ExecutionError::UnsupportedOperator(format!(
                    "{} ({}) has no input",
                    node.id,
                    node.procedure.kind()
                )))
            }
            (false, n) => {
                return Err(ExecutionError::UnsupportedOperator(format!(
                    "{} ({}) has {} inputs; only single-input operations are supported",
                    node.id,
                    node.procedure.kind(),
                    n
                )))
            }
        }
    }

    let mut pipelines = Vec::new();
    for (name, yield_ix) in plan.yields() {
        let mut stages = Vec::new();
        let mut current = Some(yield_ix);
        while let Some(ix) = current {
            let node = plan.graph.node(ix).ok_or_else(|| {
                ExecutionError::Internal(format!("plan node {:?} disappeared", ix))
            })?;
            stages.push(node.procedure.clone());
            current = plan.graph.parents(ix).first().copied();
        }
        stages.reverse();
        pipelines.push((name, stages));
    }
    Ok(pipelines)
}

/// Bytes accounted with the allocator until dropped
struct Reservation {
    alloc: Arc<MemoryAllocator>,
    bytes: usize,
}

impl Reservation {
    fn new(alloc: &Arc<MemoryAllocator>, bytes: usize) -> Result<Self> {
        alloc.allocate(bytes)?;
        Ok(Self {
            alloc: alloc.clone(),
            bytes,
        })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.alloc.free(self.bytes);
    }
}

fn records_size(records: &[Record]) -> usize {
    records
        .iter()
        .flat_map(|r| r.iter())
        .map(|(k, v)| k.len() + v.approximate_size())
        .sum()
}

fn window(rows: impl Iterator<Item = Record>, limit: Option<LimitSpec>) -> Vec<Record> {
    match limit {
        Some(limit) => rows.skip(limit.offset).take(limit.n).collect(),
        None => rows.collect(),
    }
}

/// Producer task state for one named result
struct Producer {
    name: String,
    token: CancellationToken,
    alloc: Arc<MemoryAllocator>,
    tables: mpsc::Sender<Result<Table>>,
    metadata: mpsc::Sender<Metadata>,
}

impl Producer {
    /// Apply `stages` in order. `None` when cancelled between stages.
    fn evaluate(&self, stages: &[PhysicalProcedure]) -> Result<Option<(Vec<Record>, Option<Reservation>)>> {
        let mut records: Vec<Record> = Vec::new();
        let mut held: Option<Reservation> = None;

        for stage in stages {
            if self.token.is_cancelled() {
                return Ok(None);
            }
            let output = match stage {
                PhysicalProcedure::Source { rows, limit } => window(rows.iter().cloned(), *limit),
                PhysicalProcedure::Range { start, stop, column } => records
                    .into_iter()
                    .filter(|r| {
                        r.get(column)
                            .and_then(Value::as_time)
                            .map_or(false, |t| t >= *start && t < *stop)
                    })
                    .collect(),
                PhysicalProcedure::Filter { predicates } => records
                    .into_iter()
                    .filter(|r| predicates.iter().all(|p| p.matches(r)))
                    .collect(),
                PhysicalProcedure::Limit(limit) => window(records.into_iter(), Some(*limit)),
                PhysicalProcedure::Yield { .. } => continue,
            };
            // Account the output before releasing the input.
            let reservation = Reservation::new(&self.alloc, records_size(&output))?;
            held = Some(reservation);
            records = output;
        }
        Ok(Some((records, held)))
    }

    async fn run_pipeline(self, stages: Vec<PhysicalProcedure>, batch_size: usize) {
        let (records, _reservation) = match self.evaluate(&stages) {
            Ok(Some(output)) => output,
            Ok(None) => {
                log::debug!("result {} canceled before emitting", self.name);
                return;
            }
            Err(err) => {
                log::debug!("result {} failed: {}", self.name, err);
                let _ = self.tables.send(Err(err)).await;
                return;
            }
        };

        for chunk in records.chunks(batch_size) {
            let table = Table::from_records(chunk);
            tokio::select! {
                biased;

                _ = self.token.cancelled() => return,

                sent = self.tables.send(Ok(table)) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
        self.report_rows(records.len()).await;
    }

    async fn run_value(self, value: Value) {
        let table = Table::single(VALUE_COLUMN, value);
        let _reservation = match Reservation::new(&self.alloc, table.approximate_size()) {
            Ok(reservation) => reservation,
            Err(err) => {
                let _ = self.tables.send(Err(err)).await;
                return;
            }
        };

        tokio::select! {
            biased;

            _ = self.token.cancelled() => {}

            sent = self.tables.send(Ok(table)) => {
                if sent.is_ok() {
                    self.report_rows(1).await;
                }
            }
        }
    }

    async fn report_rows(&self, rows: usize) {
        let mut md = Metadata::new();
        md.add(format!("{}/{}", ROWS_PRODUCED_KEY, self.name), rows);
        let _ = self.metadata.send(md).await;
    }
}
