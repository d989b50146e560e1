// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Side effects to specification

use crate::bytecode::SideEffect;
use crate::exec::error::{ExecutionError, Result};
use crate::spec::{Edge, Operation, OperationId, Specification, ValueResult};
use crate::values::{OperationSpec, TableObject, Value};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Assigns `{kind}{n}` ids, remembering table objects by identity
struct Ider {
    next: usize,
    lookup: HashMap<*const TableObject, OperationId>,
}

impl Ider {
    fn new() -> Self {
        Self {
            next: 0,
            lookup: HashMap::new(),
        }
    }

    fn get(&self, t: &Arc<TableObject>) -> Option<&OperationId> {
        self.lookup.get(&Arc::as_ptr(t))
    }

    fn assign(&mut self, t: &Arc<TableObject>) -> OperationId {
        let id = format!("{}{}", t.kind(), self.next);
        self.next += 1;
        self.lookup.insert(Arc::as_ptr(t), id.clone());
        id
    }
}

/// Build the specification for a program's side effects.
///
/// Stream-valued side effects contribute their whole operation chain, parents
/// before children, each distinct table object once. Plain values from
/// expression statements become value results named `_value{i}`; plain values
/// from other statements produce nothing.
pub fn from_evaluation(side_effects: &[SideEffect], now: DateTime<Utc>) -> Result<Specification> {
    let mut spec = Specification {
        operations: Vec::new(),
        edges: Vec::new(),
        values: Vec::new(),
        now,
    };
    let mut ider = Ider::new();

    for se in side_effects {
        match &se.value {
            Value::Table(table) => {
                build_operations(table, &mut ider, &mut spec);
            }
            value if se.node.is_expression_statement() => {
                let name = format!("_value{}", spec.values.len());
                spec.values.push(ValueResult {
                    name,
                    value: value.clone(),
                });
            }
            _ => {
                log::debug!("ignoring non-stream side effect of `{}`", se.node);
            }
        }
    }

    validate_result_names(&spec)?;
    Ok(spec)
}

fn build_operations(table: &Arc<TableObject>, ider: &mut Ider, spec: &mut Specification) -> OperationId {
    if let Some(id) = ider.get(table) {
        return id.clone();
    }

    let parent_ids: Vec<OperationId> = table
        .parents
        .iter()
        .map(|parent| build_operations(parent, ider, spec))
        .collect();

    let id = ider.assign(table);
    spec.operations.push(Operation {
        id: id.clone(),
        spec: table.spec.clone(),
    });
    for parent in parent_ids {
        spec.edges.push(Edge {
            parent,
            child: id.clone(),
        });
    }
    id
}

fn validate_result_names(spec: &Specification) -> Result<()> {
    let mut seen = HashSet::new();
    for op in &spec.operations {
        if let OperationSpec::Yield { name } = &op.spec {
            if name.is_empty() {
                return Err(ExecutionError::SpecificationError(format!(
                    "yield {} has an empty name",
                    op.id
                )));
            }
        }
    }
    for name in spec.result_names() {
        if !seen.insert(name) {
            return Err(ExecutionError::SpecificationError(format!(
                "tried to yield multiple results with the same name {:?}",
                name
            )));
        }
    }
    Ok(())
}
