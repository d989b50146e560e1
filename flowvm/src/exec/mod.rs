// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution
//!
//! This module provides the executor that runs physical plans, along with
//! the execution context, memory accounting, metadata and error types shared
//! by the rest of the crate.

pub mod context;
pub mod error;
pub mod executor;
pub mod memory;
pub mod metadata;
pub mod result;

// Re-export the main types for convenience
pub use context::{ExecutionContext, ExecutionDependencies};
pub use error::{Code, ExecutionError, Result};
pub use executor::{DataflowExecutor, Executor, ExecutorOutput, ROWS_PRODUCED_KEY, VALUE_COLUMN};
pub use memory::MemoryAllocator;
pub use metadata::{Metadata, Statistics};
pub use result::QueryResult;
