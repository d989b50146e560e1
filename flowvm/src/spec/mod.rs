// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical query specification
//!
//! The operation graph a program describes, before any planning decisions.

pub mod builder;

pub use builder::from_evaluation;

use crate::values::{OperationSpec, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OperationId = String;

/// A named operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub spec: OperationSpec,
}

/// Data flows from `parent` to `child`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub parent: OperationId,
    pub child: OperationId,
}

/// A program result that is a plain value rather than a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueResult {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub operations: Vec<Operation>,
    pub edges: Vec<Edge>,
    pub values: Vec<ValueResult>,
    pub now: DateTime<Utc>,
}

impl Specification {
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub fn parents(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.child == id)
            .map(|e| e.parent.as_str())
            .collect()
    }

    pub fn children(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.parent == id)
            .map(|e| e.child.as_str())
            .collect()
    }

    /// Names of every result this specification yields explicitly
    pub fn result_names(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter_map(|op| match &op.spec {
                OperationSpec::Yield { name } => Some(name.as_str()),
                _ => None,
            })
            .chain(self.values.iter().map(|v| v.name.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.values.is_empty()
    }
}
