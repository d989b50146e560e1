// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planner
//!
//! Turns a logical specification into an executable physical plan:
//! specification -> logical plan -> logical rules -> physical plan ->
//! physical rules.

use crate::exec::error::{ExecutionError, Result};
use crate::plan::logical::LogicalPlan;
use crate::plan::physical::PhysicalPlan;
use crate::plan::rules::{LogicalRule, PhysicalRule};
use crate::spec::Specification;
use std::fmt;
use std::sync::Arc;

/// Upper bound on rule applications per phase
const MAX_REWRITES: usize = 4096;

/// Converts a logical specification into a physical plan
pub trait Planner: Send + Sync {
    fn plan(&self, spec: &Specification) -> Result<PhysicalPlan>;
}

/// Extra rewrite rules supplied by the caller
#[derive(Clone, Default)]
pub struct PlanOptions {
    pub logical: Vec<Arc<dyn LogicalRule>>,
    pub physical: Vec<Arc<dyn PhysicalRule>>,
}

impl PlanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logical_rule(mut self, rule: Arc<dyn LogicalRule>) -> Self {
        self.logical.push(rule);
        self
    }

    pub fn with_physical_rule(mut self, rule: Arc<dyn PhysicalRule>) -> Self {
        self.physical.push(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.logical.is_empty() && self.physical.is_empty()
    }
}

impl fmt::Debug for PlanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanOptions")
            .field(
                "logical",
                &self.logical.iter().map(|r| r.name().to_string()).collect::<Vec<_>>(),
            )
            .field(
                "physical",
                &self.physical.iter().map(|r| r.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`DefaultPlanner`]
#[derive(Debug, Default)]
pub struct PlannerBuilder {
    options: PlanOptions,
}

impl PlannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_logical_rules(mut self, rules: impl IntoIterator<Item = Arc<dyn LogicalRule>>) -> Self {
        self.options.logical.extend(rules);
        self
    }

    pub fn add_physical_rules(
        mut self,
        rules: impl IntoIterator<Item = Arc<dyn PhysicalRule>>,
    ) -> Self {
        self.options.physical.extend(rules);
        self
    }

    /// Append every rule in `options`
    pub fn with_options(self, options: &PlanOptions) -> Self {
        self.add_logical_rules(options.logical.iter().cloned())
            .add_physical_rules(options.physical.iter().cloned())
    }

    pub fn build(self) -> DefaultPlanner {
        DefaultPlanner {
            options: self.options,
        }
    }
}

/// Planner that applies its configured rules to a fixpoint
#[derive(Debug, Default)]
pub struct DefaultPlanner {
    options: PlanOptions,
}

impl DefaultPlanner {
    pub fn options(&self) -> &PlanOptions {
        &self.options
    }
}

impl Planner for DefaultPlanner {
    fn plan(&self, spec: &Specification) -> Result<PhysicalPlan> {
        let mut logical = LogicalPlan::from_spec(spec)?;
        let applied = rewrite_to_fixpoint(&self.options.logical, &mut logical)?;
        if applied > 0 {
            log::debug!("applied {} logical rewrites", applied);
        }

        let mut physical = PhysicalPlan::from_logical(&logical);
        let applied = rewrite_to_fixpoint(&self.options.physical, &mut physical)?;
        if applied > 0 {
            log::debug!("applied {} physical rewrites", applied);
        }

        Ok(physical)
    }
}

/// Common face of logical and physical rules
trait Rewrite<P> {
    fn rule_name(&self) -> &str;
    fn apply(&self, plan: &mut P) -> Result<bool>;
}

impl Rewrite<LogicalPlan> for dyn LogicalRule {
    fn rule_name(&self) -> &str {
        self.name()
    }

    fn apply(&self, plan: &mut LogicalPlan) -> Result<bool> {
        self.rewrite(plan)
    }
}

impl Rewrite<PhysicalPlan> for dyn PhysicalRule {
    fn rule_name(&self) -> &str {
        self.name()
    }

    fn apply(&self, plan: &mut PhysicalPlan) -> Result<bool> {
        self.rewrite(plan)
    }
}

/// Apply rules until a full pass changes nothing. Returns the number of
/// rewrites applied.
fn rewrite_to_fixpoint<P, R: Rewrite<P> + ?Sized>(rules: &[Arc<R>], plan: &mut P) -> Result<usize> {
    let mut applied = 0;
    loop {
        let mut changed = false;
        for rule in rules {
            if rule.apply(plan)? {
                log::debug!("rewrite rule {} applied", rule.rule_name());
                applied += 1;
                changed = true;
            }
        }
        if !changed {
            return Ok(applied);
        }
        if applied >= MAX_REWRITES {
            return Err(ExecutionError::PlanningError(format!(
                "plan rewrites did not converge after {} applications",
                MAX_REWRITES
            )));
        }
    }
}
