// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical query plan representation
//!
//! Logical plans mirror the specification's operation graph, completed so
//! that every result is named by a `yield`. They are the input to logical
//! rewrite rules.

use crate::exec::error::{ExecutionError, Result};
use crate::plan::graph::PlanGraph;
use crate::spec::{Specification, ValueResult};
use crate::values::OperationSpec;
use chrono::{DateTime, Utc};
use petgraph::stable_graph::NodeIndex;
use std::collections::{HashMap, HashSet};

/// Name given to the generated yield of an unnamed result
pub const DEFAULT_RESULT_NAME: &str = "_result";

/// Logical plan node
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalNode {
    pub id: String,
    pub spec: OperationSpec,
    /// Added by the planner rather than written by the program
    pub generated: bool,
}

#[derive(Debug, Clone)]
pub struct LogicalPlan {
    pub graph: PlanGraph<LogicalNode>,
    pub values: Vec<ValueResult>,
    pub now: DateTime<Utc>,
}

impl LogicalPlan {
    /// Build the logical plan for a specification.
    ///
    /// Fails on cycles, on edges naming unknown operations, on a yield with
    /// children, and when more than one result is left unnamed.
    pub fn from_spec(spec: &Specification) -> Result<Self> {
        let mut graph = PlanGraph::new();
        let mut by_id: HashMap<&str, NodeIndex> = HashMap::new();

        for op in &spec.operations {
            if by_id.contains_key(op.id.as_str()) {
                return Err(ExecutionError::PlanningError(format!(
                    "duplicate operation id {}",
                    op.id
                )));
            }
            let ix = graph.add_node(LogicalNode {
                id: op.id.clone(),
                spec: op.spec.clone(),
                generated: false,
            });
            by_id.insert(op.id.as_str(), ix);
        }

        for edge in &spec.edges {
            let lookup = |id: &str| {
                by_id.get(id).copied().ok_or_else(|| {
                    ExecutionError::PlanningError(format!("edge references unknown operation {}", id))
                })
            };
            graph.add_edge(lookup(&edge.parent)?, lookup(&edge.child)?);
        }

        if graph.is_cyclic() {
            return Err(ExecutionError::PlanningError(
                "operation graph contains a cycle".to_string(),
            ));
        }

        let mut plan = Self {
            graph,
            values: spec.values.clone(),
            now: spec.now,
        };
        plan.name_results()?;
        Ok(plan)
    }

    /// Give the one unnamed sink, if any, a generated `yield`.
    fn name_results(&mut self) -> Result<()> {
        for ix in self.graph.indices() {
            if let Some(node) = self.graph.node(ix) {
                if matches!(node.spec, OperationSpec::Yield { .. }) && !self.graph.children(ix).is_empty() {
                    return Err(ExecutionError::PlanningError(format!(
                        "{} must be the last operation of its pipeline",
                        node.id
                    )));
                }
            }
        }

        let unnamed: Vec<NodeIndex> = self
            .graph
            .sinks()
            .into_iter()
            .filter(|ix| {
                self.graph
                    .node(*ix)
                    .map_or(false, |n| !matches!(n.spec, OperationSpec::Yield { .. }))
            })
            .collect();

        match unnamed.as_slice() {
            [] => {}
            [sink] => {
                let id = format!("generated_yield_{}", self.graph.node_count());
                let yield_ix = self.graph.add_node(LogicalNode {
                    id,
                    spec: OperationSpec::Yield {
                        name: DEFAULT_RESULT_NAME.to_string(),
                    },
                    generated: true,
                });
                self.graph.add_edge(*sink, yield_ix);
            }
            _ => {
                return Err(ExecutionError::PlanningError(format!(
                    "query has {} unnamed results; name each with yield",
                    unnamed.len()
                )))
            }
        }

        let mut names = HashSet::new();
        for name in self.result_names() {
            if !names.insert(name.clone()) {
                return Err(ExecutionError::PlanningError(format!(
                    "result name {:?} is used more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Result names: yields in graph order, then value results
    pub fn result_names(&self) -> Vec<String> {
        self.graph
            .indices()
            .into_iter()
            .filter_map(|ix| match self.graph.node(ix).map(|n| &n.spec) {
                Some(OperationSpec::Yield { name }) => Some(name.clone()),
                _ => None,
            })
            .chain(self.values.iter().map(|v| v.name.clone()))
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.graph
            .indices()
            .into_iter()
            .find(|ix| self.graph.node(*ix).map_or(false, |n| n.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Edge, Operation};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn spec(ops: Vec<(&str, OperationSpec)>, edges: Vec<(&str, &str)>) -> Specification {
        Specification {
            operations: ops
                .into_iter()
                .map(|(id, spec)| Operation {
                    id: id.to_string(),
                    spec,
                })
                .collect(),
            edges: edges
                .into_iter()
                .map(|(p, c)| Edge {
                    parent: p.to_string(),
                    child: c.to_string(),
                })
                .collect(),
            values: Vec::new(),
            now: now(),
        }
    }

    fn from() -> OperationSpec {
        OperationSpec::From { rows: Vec::new() }
    }

    #[test]
    fn test_unnamed_sink_gets_generated_yield() {
        let plan = LogicalPlan::from_spec(&spec(
            vec![("from0", from()), ("limit1", OperationSpec::Limit { n: 1, offset: 0 })],
            vec![("from0", "limit1")],
        ))
        .unwrap();

        assert_eq!(plan.result_names(), vec![DEFAULT_RESULT_NAME.to_string()]);
        let limit = plan.find("limit1").unwrap();
        let children = plan.graph.children(limit);
        assert_eq!(children.len(), 1);
        assert!(plan.graph.node(children[0]).unwrap().generated);
    }

    #[test]
    fn test_two_unnamed_sinks_rejected() {
        let err = LogicalPlan::from_spec(&spec(vec![("from0", from()), ("from1", from())], vec![]))
            .unwrap_err();
        assert!(err.to_string().contains("unnamed results"));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = LogicalPlan::from_spec(&spec(
            vec![
                ("limit0", OperationSpec::Limit { n: 1, offset: 0 }),
                ("limit1", OperationSpec::Limit { n: 1, offset: 0 }),
            ],
            vec![("limit0", "limit1"), ("limit1", "limit0")],
        ))
        .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_yield_with_children_rejected() {
        let err = LogicalPlan::from_spec(&spec(
            vec![
                ("from0", from()),
                ("yield1", OperationSpec::Yield { name: "a".into() }),
                ("limit2", OperationSpec::Limit { n: 1, offset: 0 }),
            ],
            vec![("from0", "yield1"), ("yield1", "limit2")],
        ))
        .unwrap_err();
        assert!(err.to_string().contains("yield1"));
    }

    #[test]
    fn test_explicit_result_name_clash_with_generated() {
        let err = LogicalPlan::from_spec(&spec(
            vec![
                ("from0", from()),
                ("yield1", OperationSpec::Yield { name: DEFAULT_RESULT_NAME.into() }),
                ("from2", from()),
            ],
            vec![("from0", "yield1")],
        ))
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_unknown_edge_rejected() {
        let err = LogicalPlan::from_spec(&spec(vec![("from0", from())], vec![("from0", "nope")]))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::PlanningError(_)));
    }
}
