// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Variable scope consulted by `SCOPE_LOOKUP`

use crate::values::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Name to value bindings with an optional enclosing scope
///
/// Execution only ever reads a scope; bindings are made while the scope is
/// being prepared, before a program runs.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: HashMap<String, Value>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope nested inside `parent`
    pub fn nest(parent: Arc<Scope>) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Bind a name, shadowing any binding in enclosing scopes
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Look a name up, innermost scope first
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.lookup(name)),
        }
    }

    /// Names bound directly in this scope
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.parent.as_ref().map_or(true, |p| p.is_empty())
    }
}

impl FromIterator<(String, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            parent: None,
        }
    }
}
