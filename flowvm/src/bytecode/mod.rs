// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bytecode definitions and the stack machine that runs them

pub mod instruction;
pub mod machine;
pub mod program;
pub mod stack;

pub use instruction::{CallOp, Instruction, OpCode};
pub use machine::{execute, QUERY_PLAN_KEY};
pub use program::{DecodeError, Program, ProgramBuilder};
pub use stack::{Frame, SideEffect, Stack};
