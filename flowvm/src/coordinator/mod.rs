// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine - configured entry point for program execution
//!
//! The Engine pairs an execution context with its configuration so callers
//! only supply a program, a scope and "now".

pub mod engine;

pub use engine::Engine;
