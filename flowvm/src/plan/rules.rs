// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan rewrite rules
//!
//! Rules are applied by the planner until none of them changes the plan.
//! Each `rewrite` call performs at most one edit and reports whether it did.

use crate::exec::error::Result;
use crate::plan::logical::LogicalPlan;
use crate::plan::physical::{PhysicalPlan, PhysicalProcedure};
use crate::values::OperationSpec;
use std::fmt::Debug;

/// Rewrite applied to the logical plan
pub trait LogicalRule: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn rewrite(&self, plan: &mut LogicalPlan) -> Result<bool>;
}

/// Rewrite applied to the physical plan
pub trait PhysicalRule: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn rewrite(&self, plan: &mut PhysicalPlan) -> Result<bool>;
}

/// Fuse `filter |> filter` into a single filter holding both predicate sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeFiltersRule;

impl LogicalRule for MergeFiltersRule {
    fn name(&self) -> &str {
        "MergeFiltersRule"
    }

    fn rewrite(&self, plan: &mut LogicalPlan) -> Result<bool> {
        for ix in plan.graph.indices() {
            let Some(OperationSpec::Filter { predicates }) = plan.graph.node(ix).map(|n| &n.spec)
            else {
                continue;
            };
            let parents = plan.graph.parents(ix);
            let [parent] = parents.as_slice() else {
                continue;
            };
            if plan.graph.children(*parent).len() != 1 {
                continue;
            }
            if !matches!(
                plan.graph.node(*parent).map(|n| &n.spec),
                Some(OperationSpec::Filter { .. })
            ) {
                continue;
            }

            let extra = predicates.clone();
            if let Some(OperationSpec::Filter { predicates }) =
                plan.graph.node_mut(*parent).map(|n| &mut n.spec)
            {
                predicates.extend(extra);
            }
            plan.graph.splice_out(ix);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Fold a `limit` directly below a source into the source itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct LimitPushdownRule;

impl PhysicalRule for LimitPushdownRule {
    fn name(&self) -> &str {
        "LimitPushdownRule"
    }

    fn rewrite(&self, plan: &mut PhysicalPlan) -> Result<bool> {
        for ix in plan.graph.indices() {
            let Some(PhysicalProcedure::Limit(window)) = plan.graph.node(ix).map(|n| &n.procedure)
            else {
                continue;
            };
            let window = *window;
            let parents = plan.graph.parents(ix);
            let [parent] = parents.as_slice() else {
                continue;
            };
            if plan.graph.children(*parent).len() != 1 {
                continue;
            }

            let folded = match plan.graph.node_mut(*parent).map(|n| &mut n.procedure) {
                Some(PhysicalProcedure::Source { limit, .. }) if limit.is_none() => {
                    *limit = Some(window);
                    true
                }
                _ => false,
            };
            if folded {
                plan.graph.splice_out(ix);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
