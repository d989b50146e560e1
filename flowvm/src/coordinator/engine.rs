// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine - configured entry point for running programs
//!
//! Wraps an execution context built from an [`EngineConfig`] and hands each
//! program a fresh allocator honoring the configured memory limit.

use crate::bytecode::{self, Program};
use crate::config::{ConfigError, EngineConfig};
use crate::exec::{ExecutionContext, ExecutionDependencies, Executor, Result};
use crate::query::Query;
use crate::values::Scope;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Engine - runs compiled programs with one configuration
///
/// # Example
/// ```no_run
/// use flowvm::{Engine, EngineConfig, ProgramBuilder, Scope};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new(EngineConfig::default())?;
/// let program = ProgramBuilder::new().build();
/// let mut query = engine.execute_now(&program, &Scope::new())?;
/// while let Some(result) = query.next_result().await {
///     println!("{}", result.name());
/// }
/// query.done().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    ctx: ExecutionContext,
}

impl Engine {
    /// Create an engine after validating `config`
    pub fn new(config: EngineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ctx: ExecutionContext::with_config(config),
        })
    }

    /// Create an engine from a JSON configuration file
    pub fn from_config_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        Self::new(EngineConfig::from_file(path)?)
    }

    pub fn with_dependencies(mut self, dependencies: ExecutionDependencies) -> Self {
        self.ctx = self.ctx.with_dependencies(dependencies);
        self
    }

    /// Every query started by this engine is cancelled along with `token`
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.ctx = self.ctx.with_token(token);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.ctx = self.ctx.with_executor(executor);
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        self.ctx.config()
    }

    /// Run `program` with the given "now"
    pub fn execute(&self, program: &Program, scope: &Scope, now: DateTime<Utc>) -> Result<Query> {
        let alloc = Arc::new(self.ctx.config().allocator());
        bytecode::execute(&self.ctx, alloc, now, program, scope)
    }

    /// Run `program` with the current time as "now"
    pub fn execute_now(&self, program: &Program, scope: &Scope) -> Result<Query> {
        self.execute(program, scope, Utc::now())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            ctx: ExecutionContext::new(),
        }
    }
}
