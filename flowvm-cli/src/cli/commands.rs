// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flowvm", version, about = "Run compiled flowvm programs")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,

    /// Decode a program file and list its instructions
    Check {
        /// JSON-encoded program
        program: PathBuf,
    },

    /// Execute a program file and print its results
    Run {
        /// JSON-encoded program
        program: PathBuf,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// The program's "now" (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,

        /// Scope variable as name=json; repeatable
        #[arg(long = "var", value_name = "NAME=JSON")]
        vars: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Print query statistics after the results
        #[arg(long)]
        stats: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
