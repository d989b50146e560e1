// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Free-form execution metadata and query statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key to list-of-values map
///
/// Adding never overwrites: values accumulate under their key, so merging
/// batches in any order yields the same set of entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata(BTreeMap<String, Vec<serde_json::Value>>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn add_all(&mut self, other: &Metadata) {
        for (key, values) in &other.0 {
            self.0
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    pub fn get(&self, key: &str) -> Option<&[serde_json::Value]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[serde_json::Value])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut md = Metadata::new();
        for (k, v) in iter {
            md.add(k, v);
        }
        md
    }
}

/// Final accounting for one query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Allocator high-water mark in bytes
    pub max_allocated: usize,
    /// Bytes allocated over the query's lifetime
    pub total_allocated: usize,
    pub metadata: Metadata,
}
