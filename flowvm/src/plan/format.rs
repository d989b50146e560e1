// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Digraph rendering of physical plans

use crate::plan::physical::PhysicalPlan;
use std::fmt;

/// Display adapter for a [`PhysicalPlan`]
///
/// ```text
/// digraph {
///   from0
///   filter1
///   // r._value > 5
///
///   from0 -> filter1
/// }
/// ```
pub struct Formatted<'a> {
    plan: &'a PhysicalPlan,
    details: bool,
}

impl<'a> Formatted<'a> {
    pub fn new(plan: &'a PhysicalPlan) -> Self {
        Self {
            plan,
            details: false,
        }
    }

    /// Print each node's procedure details as comments under it
    pub fn with_details(mut self) -> Self {
        self.details = true;
        self
    }
}

/// Format `plan` with details
pub fn formatted(plan: &PhysicalPlan) -> Formatted<'_> {
    Formatted::new(plan).with_details()
}

impl fmt::Display for Formatted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = &self.plan.graph;
        let order = graph.topological_order().unwrap_or_else(|| graph.indices());

        writeln!(f, "digraph {{")?;
        for ix in &order {
            let Some(node) = graph.node(*ix) else {
                continue;
            };
            writeln!(f, "  {}", node.id)?;
            if self.details {
                for detail in node.procedure.details() {
                    writeln!(f, "  // {}", detail)?;
                }
            }
        }
        for value in &self.plan.values {
            writeln!(f, "  {}", value.name)?;
            if self.details {
                writeln!(f, "  // value: {}", value.value)?;
            }
        }

        let edges = graph.edges();
        if !edges.is_empty() {
            writeln!(f)?;
        }
        for ix in &order {
            for (parent, child) in edges.iter().filter(|(p, _)| p == ix) {
                if let (Some(p), Some(c)) = (graph.node(*parent), graph.node(*child)) {
                    writeln!(f, "  {} -> {}", p.id, c.id)?;
                }
            }
        }
        writeln!(f, "}}")
    }
}
