// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for flowvm
//!
//! Runs compiled program files and prints their results.

pub mod commands;
pub mod output;
pub mod run;

pub use commands::{Cli, Commands};
pub use run::{handle_check, handle_run, RunOptions};
