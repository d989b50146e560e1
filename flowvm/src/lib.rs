// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! flowvm - A bytecode-driven execution core for streaming dataflow queries
//!
//! flowvm runs compiled programs: a stack machine evaluates the instruction
//! stream into side effects, the side effects become a logical operation
//! graph, the planner turns that into a physical plan, and the executor
//! streams named results back through a cancellable query handle.
//!
//! # Pipeline
//!
//! ```text
//! instructions -> stack machine -> side effects -> specification
//!              -> planner -> physical plan -> executor -> Query
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use flowvm::{Engine, Instruction, Node, ProgramBuilder, Scope, Value};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let program = ProgramBuilder::new()
//!     .statement(Node::expression("x"), [Instruction::scope_lookup("x")])
//!     .build();
//! let scope = Scope::new().with("x", Value::Int(1));
//!
//! let mut query = Engine::default().execute_now(&program, &scope)?;
//! while let Some(result) = query.next_result().await {
//!     let table = result.concat().await?;
//!     println!("{:?}", table);
//! }
//! query.done().await;
//! # Ok(())
//! # }
//! ```

pub mod bytecode;
pub mod config;
pub mod coordinator;
pub mod exec;
pub mod plan;
pub mod query;
pub mod semantic;
pub mod spec;
pub mod values;

pub use bytecode::{execute, Instruction, OpCode, Program, ProgramBuilder, SideEffect};
pub use config::{ConfigError, EngineConfig};
pub use coordinator::Engine;
pub use exec::{
    Code, DataflowExecutor, ExecutionContext, ExecutionDependencies, ExecutionError, Executor,
    MemoryAllocator, Metadata, QueryResult, Statistics,
};
pub use plan::{PlanOptions, Planner, PlannerBuilder};
pub use query::{CancelTrigger, Query, ResultStream};
pub use semantic::{AnalysisError, Node, SourceLocation};
pub use spec::Specification;
pub use values::{Scope, Table, Value};

/// flowvm version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// flowvm crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
