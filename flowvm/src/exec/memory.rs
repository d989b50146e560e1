// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Memory accounting for query execution
//!
//! The executor reports every table it materializes to the query's
//! allocator. The allocator enforces an optional limit and keeps the
//! figures the query reports once it is done: the high-water mark and the
//! cumulative total.

use crate::exec::error::ExecutionError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-query memory accountant
///
/// Uses atomics so the executor's producer tasks can account concurrently.
pub struct MemoryAllocator {
    /// Maximum bytes live at once
    limit: usize,
    allocated: AtomicUsize,
    max_allocated: AtomicUsize,
    total_allocated: AtomicUsize,
}

impl std::fmt::Debug for MemoryAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAllocator")
            .field("limit", &self.limit)
            .field("allocated", &self.allocated())
            .field("max_allocated", &self.max_allocated())
            .field("total_allocated", &self.total_allocated())
            .finish()
    }
}

impl Default for MemoryAllocator {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl MemoryAllocator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            allocated: AtomicUsize::new(0),
            max_allocated: AtomicUsize::new(0),
            total_allocated: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Account for `bytes` newly live bytes
    ///
    /// # Returns
    /// - `Err(ExecutionError::MemoryLimitExceeded)` if the limit would be
    ///   crossed; nothing is accounted in that case
    pub fn allocate(&self, bytes: usize) -> Result<(), ExecutionError> {
        let current = self.allocated.fetch_add(bytes, Ordering::SeqCst);
        let new_total = current.saturating_add(bytes);

        if new_total > self.limit {
            self.allocated.fetch_sub(bytes, Ordering::SeqCst);
            return Err(ExecutionError::MemoryLimitExceeded {
                limit: self.limit,
                requested: new_total,
            });
        }

        self.max_allocated.fetch_max(new_total, Ordering::SeqCst);
        self.total_allocated.fetch_add(bytes, Ordering::SeqCst);
        Ok(())
    }

    /// Release bytes previously accounted with [`allocate`](Self::allocate)
    pub fn free(&self, bytes: usize) {
        let _ = self
            .allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_sub(bytes))
            });
    }

    /// Bytes currently live
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    /// High-water mark of live bytes
    pub fn max_allocated(&self) -> usize {
        self.max_allocated.load(Ordering::SeqCst)
    }

    /// Sum of every successful allocation
    pub fn total_allocated(&self) -> usize {
        self.total_allocated.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
