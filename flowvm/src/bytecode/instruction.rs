// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Instruction set
//!
//! Each instruction is an opcode together with the payload that opcode needs.
//! The payload shapes are closed, so the machine matches on them exhaustively.

use crate::semantic::Node;
use crate::values::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bare opcode tag, for logging and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Call,
    ScopeLookup,
    Pop,
    ConsSideEffects,
    LoadValue,
    AppendSideEffect,
    ProgramStart,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Call => "CALL",
            OpCode::ScopeLookup => "SCOPE_LOOKUP",
            OpCode::Pop => "POP",
            OpCode::ConsSideEffects => "CONS_SIDE_EFFECTS",
            OpCode::LoadValue => "LOAD_VALUE",
            OpCode::AppendSideEffect => "APPEND_SIDE_EFFECT",
            OpCode::ProgramStart => "PROGRAM_START",
        };
        f.write_str(name)
    }
}

/// Payload of `CALL`
///
/// The call was already evaluated when the program was compiled; `result`
/// is what it returned. Executing the instruction only reconciles the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOp {
    pub nargs: usize,
    pub result: Value,
}

/// A single bytecode instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    /// Pop `nargs` arguments and the callee, push the call's result
    Call(CallOp),
    /// Push the value bound to `name`
    ScopeLookup { name: String },
    /// Discard the top value
    Pop,
    /// Push an empty side-effect list
    ConsSideEffects,
    /// Push a literal
    LoadValue { value: Value },
    /// Pop a value and append it, tagged with `node`, to the list beneath
    AppendSideEffect { node: Node },
    /// Pop the side-effect list and start the program. Always last.
    ProgramStart,
}

impl Instruction {
    pub fn call(nargs: usize, result: Value) -> Self {
        Instruction::Call(CallOp { nargs, result })
    }

    pub fn scope_lookup(name: impl Into<String>) -> Self {
        Instruction::ScopeLookup { name: name.into() }
    }

    pub fn load_value(value: impl Into<Value>) -> Self {
        Instruction::LoadValue {
            value: value.into(),
        }
    }

    pub fn append_side_effect(node: Node) -> Self {
        Instruction::AppendSideEffect { node }
    }

    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Call(_) => OpCode::Call,
            Instruction::ScopeLookup { .. } => OpCode::ScopeLookup,
            Instruction::Pop => OpCode::Pop,
            Instruction::ConsSideEffects => OpCode::ConsSideEffects,
            Instruction::LoadValue { .. } => OpCode::LoadValue,
            Instruction::AppendSideEffect { .. } => OpCode::AppendSideEffect,
            Instruction::ProgramStart => OpCode::ProgramStart,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Call(call) => write!(f, "{} {} -> {}", self.opcode(), call.nargs, call.result),
            Instruction::ScopeLookup { name } => write!(f, "{} {}", self.opcode(), name),
            Instruction::LoadValue { value } => write!(f, "{} {}", self.opcode(), value),
            Instruction::AppendSideEffect { node } => write!(f, "{} {}", self.opcode(), node),
            _ => write!(f, "{}", self.opcode()),
        }
    }
}
