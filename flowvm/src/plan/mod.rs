// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planning
//!
//! This module converts a logical specification into a physical plan the
//! executor can run. It includes logical plan construction, rewrite rules,
//! physical plan conversion, and a digraph formatter for diagnostics.

pub mod format;
pub mod graph;
pub mod logical;
pub mod physical;
pub mod planner;
pub mod rules;

pub use format::{formatted, Formatted};
pub use graph::PlanGraph;
pub use logical::{LogicalNode, LogicalPlan, DEFAULT_RESULT_NAME};
pub use physical::{LimitSpec, PhysicalNode, PhysicalPlan, PhysicalProcedure};
pub use planner::{DefaultPlanner, PlanOptions, Planner, PlannerBuilder};
pub use rules::{LimitPushdownRule, LogicalRule, MergeFiltersRule, PhysicalRule};
