// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command handlers

use crate::cli::commands::OutputFormat;
use crate::cli::output::ResultFormatter;
use chrono::{DateTime, Utc};
use colored::Colorize;
use flowvm::{Engine, ExecutionError, Program, Scope, Value};
use std::path::PathBuf;

pub struct RunOptions {
    pub program: PathBuf,
    pub config: Option<PathBuf>,
    pub now: Option<String>,
    pub vars: Vec<String>,
    pub format: OutputFormat,
    pub stats: bool,
}

/// Decode a program and print its instruction listing
pub fn handle_check(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let program = Program::from_file(&path)?;
    println!(
        "{} {} ({} instructions)",
        "valid".bold().green(),
        path.display(),
        program.len()
    );
    for (pc, instruction) in program.instructions.iter().enumerate() {
        println!("{:>4}  {}", pc, instruction);
    }
    Ok(())
}

pub async fn handle_run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let program = Program::from_file(&options.program)?;
    let engine = match &options.config {
        Some(path) => Engine::from_config_file(path)?,
        None => Engine::default(),
    };
    let now = match &options.now {
        Some(text) => DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc),
        None => Utc::now(),
    };
    let scope = parse_scope(&options.vars)?;

    let mut query = match engine.execute(&program, &scope, now) {
        Ok(query) => query,
        Err(e) => {
            report(&e);
            return Err(e.into());
        }
    };
    log::info!("query {} started", query.id());

    // Ctrl-C shares the query's own cancel path
    let interrupts = query.cancel_trigger().listen_for_interrupt();

    let mut failed = None;
    while let Some(mut result) = query.next_result().await {
        let name = result.name().to_string();
        while let Some(table) = result.next_table().await {
            match table {
                Ok(table) => print!("{}", ResultFormatter::format(&name, &table, options.format)),
                Err(e) => {
                    report(&e);
                    failed.get_or_insert(e);
                    break;
                }
            }
        }
    }

    query.done().await;
    interrupts.abort();

    if options.stats {
        print!("{}", ResultFormatter::format_statistics(&query.statistics()));
    }
    if let Some(e) = query.err() {
        report(&e);
        return Err(e.into());
    }
    match failed {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn report(err: &ExecutionError) {
    let message = match err.analysis_error() {
        Some(analysis) => analysis.pretty(),
        None => err.to_string(),
    };
    eprintln!("{} {}", "Error:".bold().red(), message);
}

fn parse_scope(vars: &[String]) -> Result<Scope, Box<dyn std::error::Error>> {
    let mut scope = Scope::new();
    for var in vars {
        let (name, json) = var
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=JSON, got {:?}", var))?;
        scope.set(name.trim(), parse_value(json)?);
    }
    Ok(scope)
}

/// Plain JSON scalars map to the matching value; anything else must be a
/// tagged value such as `{"type":"int","value":1}`.
fn parse_value(json: &str) -> Result<Value, serde_json::Error> {
    let raw: serde_json::Value = serde_json::from_str(json)?;
    Ok(match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        other => serde_json::from_value(other)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_scalars() {
        assert_eq!(parse_value("1").unwrap(), Value::Int(1));
        assert_eq!(parse_value("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(parse_value("\"a\"").unwrap(), Value::String("a".into()));
        assert_eq!(
            parse_value(r#"{"type":"duration","value":60}"#).unwrap(),
            Value::Duration(60)
        );
        assert!(parse_value("{}").is_err());
    }

    #[test]
    fn test_parse_scope() {
        let scope = parse_scope(&["x=1".to_string(), "name=\"cpu\"".to_string()]).unwrap();
        assert_eq!(scope.lookup("x"), Some(&Value::Int(1)));
        assert_eq!(scope.lookup("name"), Some(&Value::String("cpu".into())));
        assert!(parse_scope(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_check_reads_program_file() {
        let program = flowvm::ProgramBuilder::new().build();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), program.to_json().unwrap()).unwrap();
        handle_check(file.path().to_path_buf()).unwrap();
    }
}
