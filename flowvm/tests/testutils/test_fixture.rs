//! Test fixture for flowvm integration tests
//!
//! Uses only the public crate API.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use flowvm::exec::ExecutionError;
use flowvm::values::{OperationSpec, Record, TableObject};
use flowvm::{Engine, EngineConfig, Node, Program, Query, Scope, Table, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fixed "now" so relative ranges are reproducible
pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Records `{_time, _value}` one minute apart, ending one minute before now
pub fn series(values: &[i64]) -> Vec<Record> {
    let n = values.len() as i64;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let mut r = Record::new();
            r.insert(
                "_time".to_string(),
                Value::Time(now() - chrono::Duration::minutes(n - i as i64)),
            );
            r.insert("_value".to_string(), Value::Int(*v));
            r
        })
        .collect()
}

/// `from(rows) |> op |> op ...` as a stream value
pub fn stream(rows: Vec<Record>, ops: Vec<OperationSpec>) -> Value {
    let mut table = TableObject::source(OperationSpec::From { rows });
    for op in ops {
        table = TableObject::pipe(&table, op);
    }
    Value::Table(table)
}

/// Drained query output
pub struct Outcome {
    pub tables: BTreeMap<String, Result<Table, ExecutionError>>,
    pub query: Query,
}

pub struct TestFixture {
    engine: Engine,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            engine: Engine::default(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config).expect("valid engine config"),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// One expression statement per value, read back through the scope
    pub fn program_for(values: &[(&str, Value)]) -> (Program, Scope) {
        let mut builder = flowvm::ProgramBuilder::new();
        let mut scope = Scope::new();
        for (name, value) in values {
            builder = builder.statement(
                Node::expression(*name),
                [flowvm::Instruction::scope_lookup(*name)],
            );
            scope.set(*name, value.clone());
        }
        (builder.build(), scope)
    }

    pub fn start(&self, program: &Program, scope: &Scope) -> Result<Query, ExecutionError> {
        self.engine.execute(program, scope, now())
    }

    /// Run to completion, collecting every result into one table each
    pub async fn run(&self, program: &Program, scope: &Scope) -> Result<Outcome, ExecutionError> {
        let query = self.start(program, scope)?;
        Ok(drain(query).await)
    }
}

pub async fn drain(mut query: Query) -> Outcome {
    let mut tables = BTreeMap::new();
    while let Some(result) = query.next_result().await {
        let name = result.name().to_string();
        tables.insert(name, result.concat().await);
    }
    query.done().await;
    Outcome { tables, query }
}

pub fn shared(value: &Value) -> Arc<TableObject> {
    value.as_table().cloned().expect("stream value")
}
