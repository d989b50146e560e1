// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! flowvm CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "flowvm".bold().green(), flowvm::VERSION);
            println!("Bytecode execution core for streaming dataflow queries");
            Ok(())
        }

        Commands::Check { program } => cli::handle_check(program),

        Commands::Run {
            program,
            config,
            now,
            vars,
            format,
            stats,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(cli::handle_run(cli::RunOptions {
                program,
                config,
                now,
                vars,
                format,
                stats,
            }))
        }
    }
}
