//! Executor double that produces no results, only metadata batches

#![allow(dead_code)]

use flowvm::exec::{ExecutionContext, Executor, ExecutorOutput, MemoryAllocator, Metadata};
use flowvm::plan::PhysicalPlan;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sends each batch from its own task, so batches race each other
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    pub batches: Vec<Metadata>,
    /// Bytes to account (and release) before returning
    pub allocate: usize,
}

impl Executor for ScriptedExecutor {
    fn execute(
        &self,
        _ctx: &ExecutionContext,
        _plan: &PhysicalPlan,
        alloc: Arc<MemoryAllocator>,
    ) -> flowvm::exec::Result<ExecutorOutput> {
        if self.allocate > 0 {
            alloc.allocate(self.allocate)?;
            alloc.free(self.allocate);
        }
        let (tx, rx) = mpsc::channel(1);
        for batch in &self.batches {
            let tx = tx.clone();
            let batch = batch.clone();
            tokio::spawn(async move {
                let _ = tx.send(batch).await;
            });
        }
        Ok((BTreeMap::new(), rx))
    }
}
