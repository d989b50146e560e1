// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stream values and materialized tables
//!
//! A [`TableObject`] is what a pipeline expression evaluates to: an operation
//! plus the table objects feeding it. Nothing runs until the program starts;
//! the specification builder walks these chains to build the operation graph.

use crate::values::value::Value;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A record: column name to value
pub type Record = BTreeMap<String, Value>;

/// Bound of a `range` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBound {
    Absolute(DateTime<Utc>),
    /// Nanoseconds relative to the program's "now"
    Relative(i64),
}

impl TimeBound {
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeBound::Absolute(t) => *t,
            TimeBound::Relative(ns) => now + Duration::nanoseconds(*ns),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBound::Absolute(t) => write!(f, "{}", t.to_rfc3339()),
            TimeBound::Relative(ns) => write!(f, "now{:+}ns", ns),
        }
    }
}

/// Comparison operator used by filter predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// `column <op> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// A row whose column is missing, or whose value does not order against
    /// the predicate's value, does not match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.column) else {
            return false;
        };
        if matches!(self.op, CompareOp::Eq | CompareOp::Ne) && actual.compare(&self.value).is_none() {
            let equal = actual == &self.value;
            return if self.op == CompareOp::Eq { equal } else { !equal };
        }
        match actual.compare(&self.value) {
            Some(ordering) => match self.op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
            },
            None => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r.{} {} {}", self.column, self.op, self.value)
    }
}

/// Operation an individual pipeline stage performs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationSpec {
    From {
        rows: Vec<Record>,
    },
    Range {
        start: TimeBound,
        #[serde(default)]
        stop: Option<TimeBound>,
        #[serde(default = "default_time_column")]
        column: String,
    },
    Filter {
        predicates: Vec<Predicate>,
    },
    Limit {
        n: usize,
        #[serde(default)]
        offset: usize,
    },
    Yield {
        name: String,
    },
}

fn default_time_column() -> String {
    "_time".to_string()
}

impl OperationSpec {
    /// Operation kind, used as the prefix of operation ids
    pub fn kind(&self) -> &'static str {
        match self {
            OperationSpec::From { .. } => "from",
            OperationSpec::Range { .. } => "range",
            OperationSpec::Filter { .. } => "filter",
            OperationSpec::Limit { .. } => "limit",
            OperationSpec::Yield { .. } => "yield",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, OperationSpec::From { .. })
    }
}

/// Lazily described stream: one operation and its inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableObject {
    pub spec: OperationSpec,
    #[serde(default)]
    pub parents: Vec<Arc<TableObject>>,
}

impl TableObject {
    /// Source stream with no parents
    pub fn source(spec: OperationSpec) -> Arc<Self> {
        Arc::new(Self {
            spec,
            parents: Vec::new(),
        })
    }

    /// Stream that applies `spec` to `parent`
    pub fn pipe(parent: &Arc<TableObject>, spec: OperationSpec) -> Arc<Self> {
        Arc::new(Self {
            spec,
            parents: vec![parent.clone()],
        })
    }

    pub fn kind(&self) -> &'static str {
        self.spec.kind()
    }
}

/// A materialized batch of rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from records; columns are the sorted union of keys and
    /// missing cells become null.
    pub fn from_records(records: &[Record]) -> Self {
        let columns: Vec<String> = records
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let rows = records
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| r.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Table with a single column and a single row
    pub fn single(column: impl Into<String>, value: Value) -> Self {
        Self {
            columns: vec![column.into()],
            rows: vec![vec![value]],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Row `i` as a record, omitting null cells
    pub fn record(&self, i: usize) -> Option<Record> {
        let row = self.rows.get(i)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .filter(|(_, v)| !v.is_null())
                .map(|(c, v)| (c.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn approximate_size(&self) -> usize {
        self.columns.iter().map(String::len).sum::<usize>()
            + self
                .rows
                .iter()
                .flat_map(|r| r.iter())
                .map(Value::approximate_size)
                .sum::<usize>()
    }
}
