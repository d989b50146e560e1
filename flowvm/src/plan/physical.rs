// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical query plan representation
//!
//! Physical plans are what the executor runs: every relative time has been
//! resolved against the program's "now", and rewrite rules may have fused
//! stages together.

use crate::plan::graph::PlanGraph;
use crate::plan::logical::LogicalPlan;
use crate::spec::ValueResult;
use crate::values::{OperationSpec, Predicate, Record};
use chrono::{DateTime, Utc};
use petgraph::stable_graph::NodeIndex;
use std::fmt;

/// Row window applied by `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSpec {
    pub n: usize,
    pub offset: usize,
}

impl fmt::Display for LimitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limit: {}, offset: {}", self.n, self.offset)
    }
}

/// Physical execution procedure
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalProcedure {
    /// Emit inline rows, optionally windowed at the source
    Source {
        rows: Vec<Record>,
        limit: Option<LimitSpec>,
    },
    /// Keep rows whose `column` lies in `[start, stop)`
    Range {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        column: String,
    },
    /// Keep rows matching every predicate
    Filter { predicates: Vec<Predicate> },
    Limit(LimitSpec),
    /// Hand rows to the named result
    Yield { name: String },
}

impl PhysicalProcedure {
    fn from_logical(spec: &OperationSpec, now: DateTime<Utc>) -> Self {
        match spec {
            OperationSpec::From { rows } => PhysicalProcedure::Source {
                rows: rows.clone(),
                limit: None,
            },
            OperationSpec::Range { start, stop, column } => PhysicalProcedure::Range {
                start: start.resolve(now),
                stop: stop.as_ref().map_or(now, |s| s.resolve(now)),
                column: column.clone(),
            },
            OperationSpec::Filter { predicates } => PhysicalProcedure::Filter {
                predicates: predicates.clone(),
            },
            OperationSpec::Limit { n, offset } => PhysicalProcedure::Limit(LimitSpec {
                n: *n,
                offset: *offset,
            }),
            OperationSpec::Yield { name } => PhysicalProcedure::Yield { name: name.clone() },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PhysicalProcedure::Source { .. } => "source",
            PhysicalProcedure::Range { .. } => "range",
            PhysicalProcedure::Filter { .. } => "filter",
            PhysicalProcedure::Limit(_) => "limit",
            PhysicalProcedure::Yield { .. } => "yield",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, PhysicalProcedure::Source { .. })
    }

    /// One line per detail, used by the plan formatter
    pub fn details(&self) -> Vec<String> {
        match self {
            PhysicalProcedure::Source { rows, limit } => {
                let mut details = vec![format!("rows: {}", rows.len())];
                if let Some(limit) = limit {
                    details.push(limit.to_string());
                }
                details
            }
            PhysicalProcedure::Range { start, stop, column } => vec![format!(
                "{} in [{}, {})",
                column,
                start.to_rfc3339(),
                stop.to_rfc3339()
            )],
            PhysicalProcedure::Filter { predicates } => vec![predicates
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" and ")],
            PhysicalProcedure::Limit(limit) => vec![limit.to_string()],
            PhysicalProcedure::Yield { name } => vec![format!("name: {}", name)],
        }
    }
}

/// Physical plan node
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalNode {
    pub id: String,
    pub procedure: PhysicalProcedure,
}

/// Physical query plan
#[derive(Debug, Clone)]
pub struct PhysicalPlan {
    pub graph: PlanGraph<PhysicalNode>,
    pub values: Vec<ValueResult>,
    pub now: DateTime<Utc>,
}

impl PhysicalPlan {
    /// Convert a logical plan node-for-node, keeping node indices
    pub fn from_logical(logical: &LogicalPlan) -> Self {
        let mut graph = PlanGraph::new();
        let mut mapping = Vec::new();
        for ix in logical.graph.indices() {
            if let Some(node) = logical.graph.node(ix) {
                let physical_ix = graph.add_node(PhysicalNode {
                    id: node.id.clone(),
                    procedure: PhysicalProcedure::from_logical(&node.spec, logical.now),
                });
                mapping.push((ix, physical_ix));
            }
        }
        let lookup = |ix: NodeIndex| {
            mapping
                .iter()
                .find(|(l, _)| *l == ix)
                .map(|(_, p)| *p)
        };
        for (parent, child) in logical.graph.edges() {
            if let (Some(p), Some(c)) = (lookup(parent), lookup(child)) {
                graph.add_edge(p, c);
            }
        }

        Self {
            graph,
            values: logical.values.clone(),
            now: logical.now,
        }
    }

    /// `(result name, yield node)` for every yield, in index order
    pub fn yields(&self) -> Vec<(String, NodeIndex)> {
        self.graph
            .indices()
            .into_iter()
            .filter_map(|ix| match self.graph.node(ix).map(|n| &n.procedure) {
                Some(PhysicalProcedure::Yield { name }) => Some((name.clone(), ix)),
                _ => None,
            })
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.graph
            .indices()
            .into_iter()
            .find(|ix| self.graph.node(*ix).map_or(false, |n| n.id == id))
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.graph
            .indices()
            .into_iter()
            .filter_map(|ix| self.graph.node(ix).map(|n| n.id.clone()))
            .collect()
    }

    pub fn result_count(&self) -> usize {
        self.yields().len() + self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Edge, Operation, Specification};
    use crate::values::TimeBound;

    #[test]
    fn test_range_resolved_against_now() {
        let now = DateTime::parse_from_rfc3339("2024-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let spec = Specification {
            operations: vec![
                Operation {
                    id: "from0".into(),
                    spec: OperationSpec::From { rows: Vec::new() },
                },
                Operation {
                    id: "range1".into(),
                    spec: OperationSpec::Range {
                        start: TimeBound::Relative(-3_600_000_000_000),
                        stop: None,
                        column: "_time".into(),
                    },
                },
            ],
            edges: vec![Edge {
                parent: "from0".into(),
                child: "range1".into(),
            }],
            values: Vec::new(),
            now,
        };
        let logical = LogicalPlan::from_spec(&spec).unwrap();
        let physical = PhysicalPlan::from_logical(&logical);

        let range = physical.find("range1").unwrap();
        match &physical.graph.node(range).unwrap().procedure {
            PhysicalProcedure::Range { start, stop, .. } => {
                assert_eq!(*stop, now);
                assert_eq!(*start, now - chrono::Duration::hours(1));
            }
            other => panic!("unexpected procedure {:?}", other),
        }
        assert_eq!(physical.yields().len(), 1);
        assert_eq!(physical.graph.edge_count(), 2);
    }
}
