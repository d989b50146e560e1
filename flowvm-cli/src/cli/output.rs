// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use crate::cli::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table as DisplayTable};
use flowvm::{Statistics, Table, Value};

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    /// Format one table of a named result
    pub fn format(name: &str, table: &Table, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(name, table),
            OutputFormat::Json => Self::format_json(name, table),
        }
    }

    fn format_table(name: &str, table: &Table) -> String {
        let mut output = format!("{} {}\n", "Result:".bold().green(), name);
        if table.is_empty() {
            output.push_str(&format!("{}\n", "No rows".yellow()));
            return output;
        }

        let mut display = DisplayTable::new();
        display.load_preset(UTF8_FULL);
        display.set_header(
            table
                .columns
                .iter()
                .map(|col| Cell::new(col).fg(Color::Green))
                .collect::<Vec<_>>(),
        );
        for row in &table.rows {
            display.add_row(row.iter().map(Self::value_to_string).collect::<Vec<_>>());
        }

        output.push_str(&display.to_string());
        output.push_str(&format!("\nRows returned: {}\n\n", table.len()));
        output
    }

    fn format_json(name: &str, table: &Table) -> String {
        let rows: Vec<serde_json::Value> = table
            .rows
            .iter()
            .map(|row| {
                let fields = table
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, v)| (col.clone(), Self::value_to_json(v)))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(fields)
            })
            .collect();
        let json = serde_json::json!({
            "result": name,
            "columns": table.columns,
            "rows": rows,
        });

        let mut text = serde_json::to_string_pretty(&json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}".to_string()
        });
        text.push('\n');
        text
    }

    pub fn format_statistics(stats: &Statistics) -> String {
        let mut output = format!("{}\n", "Statistics".bold().green());
        output.push_str(&format!("Max allocated: {} bytes\n", stats.max_allocated));
        output.push_str(&format!("Total allocated: {} bytes\n", stats.total_allocated));
        for (key, values) in stats.metadata.iter() {
            for value in values {
                match value.as_str() {
                    Some(text) if text.contains('\n') => {
                        output.push_str(&format!("{}:\n{}", key.cyan(), text))
                    }
                    _ => output.push_str(&format!("{}: {}\n", key.cyan(), value)),
                }
            }
        }
        output
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        }
    }

    fn value_to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Float(f) => serde_json::json!(f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::value_to_json).collect())
            }
            Value::Record(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::value_to_json(v)))
                    .collect(),
            ),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}
