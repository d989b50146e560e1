// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Ambient execution context
//!
//! Carries what a program run needs from its caller: the cancellation token
//! the query's own token is derived from, optional execution dependencies
//! (pre-populated metadata and plan rewrite options), the executor, and the
//! engine configuration. The pipeline reads the context, never mutates it.

use crate::config::EngineConfig;
use crate::exec::executor::{DataflowExecutor, Executor};
use crate::exec::metadata::Metadata;
use crate::plan::PlanOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Values established while the program was being evaluated
#[derive(Debug, Clone, Default)]
pub struct ExecutionDependencies {
    /// Merged into every query's statistics
    pub metadata: Metadata,
    /// Extra planner rewrite rules
    pub plan_options: PlanOptions,
}

impl ExecutionDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_plan_options(mut self, plan_options: PlanOptions) -> Self {
        self.plan_options = plan_options;
        self
    }
}

#[derive(Clone)]
pub struct ExecutionContext {
    token: CancellationToken,
    dependencies: Option<Arc<ExecutionDependencies>>,
    executor: Arc<dyn Executor>,
    config: Arc<EngineConfig>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.token.is_cancelled())
            .field("dependencies", &self.dependencies)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Root context with default configuration and the dataflow executor
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            token: CancellationToken::new(),
            dependencies: None,
            executor: Arc::new(DataflowExecutor::new(config.clone())),
            config,
        }
    }

    /// Use `token` as the parent of every query started from this context
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_dependencies(mut self, dependencies: ExecutionDependencies) -> Self {
        self.dependencies = Some(Arc::new(dependencies));
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Derive a context whose token is a child of this one's.
    ///
    /// Cancelling the child leaves this context untouched; cancelling this
    /// context cancels the child.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            ..self.clone()
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn has_dependencies(&self) -> bool {
        self.dependencies.is_some()
    }

    pub fn dependencies(&self) -> Option<&ExecutionDependencies> {
        self.dependencies.as_deref()
    }

    /// Plan options from the dependencies, or none
    pub fn plan_options(&self) -> PlanOptions {
        self.dependencies
            .as_ref()
            .map(|d| d.plan_options.clone())
            .unwrap_or_default()
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_cancellation_does_not_propagate_up() {
        let root = ExecutionContext::new();
        let child = root.child();

        child.token().cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_parent_cancellation_reaches_child() {
        let root = ExecutionContext::new();
        let child = root.child();

        root.token().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_plan_options_default_to_none() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.has_dependencies());
        assert!(ctx.plan_options().is_empty());
    }
}
