// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Directed operation graph shared by logical and physical plans

use petgraph::algo::is_cyclic_directed;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Directed graph whose edges point from producer to consumer
///
/// Node indices stay valid when other nodes are removed, so rewrite rules
/// can hold indices across edits.
#[derive(Debug, Clone)]
pub struct PlanGraph<N> {
    graph: StableDiGraph<N, ()>,
}

impl<N> Default for PlanGraph<N> {
    fn default() -> Self {
        Self {
            graph: StableDiGraph::new(),
        }
    }
}

impl<N> PlanGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: N) -> NodeIndex {
        self.graph.add_node(node)
    }

    pub fn add_edge(&mut self, parent: NodeIndex, child: NodeIndex) {
        if self.graph.find_edge(parent, child).is_none() {
            self.graph.add_edge(parent, child, ());
        }
    }

    pub fn node(&self, ix: NodeIndex) -> Option<&N> {
        self.graph.node_weight(ix)
    }

    pub fn node_mut(&mut self, ix: NodeIndex) -> Option<&mut N> {
        self.graph.node_weight_mut(ix)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node indices in ascending order
    pub fn indices(&self) -> Vec<NodeIndex> {
        let mut ixs: Vec<NodeIndex> = self.graph.node_indices().collect();
        ixs.sort();
        ixs
    }

    pub fn parents(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(ix, Direction::Incoming)
    }

    pub fn children(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(ix, Direction::Outgoing)
    }

    fn neighbors(&self, ix: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut ixs: Vec<NodeIndex> = self.graph.neighbors_directed(ix, dir).collect();
        ixs.sort();
        ixs
    }

    /// Nodes without children
    pub fn sinks(&self) -> Vec<NodeIndex> {
        self.indices()
            .into_iter()
            .filter(|ix| self.children(*ix).is_empty())
            .collect()
    }

    /// Nodes without parents
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.indices()
            .into_iter()
            .filter(|ix| self.parents(*ix).is_empty())
            .collect()
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Parents before children, ties broken by lowest index.
    ///
    /// Returns `None` if the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeIndex>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|ix| (ix, self.parents(ix).len()))
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(ix, _)| Reverse(*ix))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(ix)) = ready.pop() {
            order.push(ix);
            for child in self.children(ix) {
                if let Some(d) = in_degree.get_mut(&child) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(child));
                    }
                }
            }
        }

        if order.len() == self.graph.node_count() {
            Some(order)
        } else {
            None
        }
    }

    /// Remove `ix`, connecting each of its parents to each of its children
    pub fn splice_out(&mut self, ix: NodeIndex) -> Option<N> {
        let parents = self.parents(ix);
        let children = self.children(ix);
        for parent in &parents {
            for child in &children {
                self.add_edge(*parent, *child);
            }
        }
        self.graph.remove_node(ix)
    }

    /// Every edge as `(parent, child)`, ordered by parent then child index
    pub fn edges(&self) -> Vec<(NodeIndex, NodeIndex)> {
        self.indices()
            .into_iter()
            .flat_map(|p| self.children(p).into_iter().map(move |c| (p, c)))
            .collect()
    }
}
