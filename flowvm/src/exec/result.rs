// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Named query results

use crate::exec::error::Result;
use crate::values::Table;
use tokio::sync::mpsc;

/// One named result of a query: a stream of tables
///
/// A table-level failure (for example an exceeded memory limit) arrives as
/// an `Err` item; the stream ends when its producer finishes.
#[derive(Debug)]
pub struct QueryResult {
    name: String,
    tables: mpsc::Receiver<Result<Table>>,
}

impl QueryResult {
    pub fn new(name: impl Into<String>, tables: mpsc::Receiver<Result<Table>>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next table, or `None` once the stream has ended
    pub async fn next_table(&mut self) -> Option<Result<Table>> {
        self.tables.recv().await
    }

    /// Drain the stream, stopping at the first error
    pub async fn collect(mut self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        while let Some(table) = self.tables.recv().await {
            tables.push(table?);
        }
        Ok(tables)
    }

    /// Drain the stream into a single table
    pub async fn concat(self) -> Result<Table> {
        let mut merged = Table::default();
        for table in self.collect().await? {
            if merged.columns.is_empty() {
                merged.columns = table.columns.clone();
            }
            if merged.columns == table.columns {
                merged.rows.extend(table.rows);
            } else {
                let records: Vec<_> = (0..merged.len())
                    .filter_map(|i| merged.record(i))
                    .chain((0..table.len()).filter_map(|i| table.record(i)))
                    .collect();
                merged = Table::from_records(&records);
            }
        }
        Ok(merged)
    }
}
