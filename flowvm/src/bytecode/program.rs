// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compiled programs and their on-disk JSON encoding

use crate::bytecode::instruction::{Instruction, OpCode};
use crate::semantic::Node;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors decoding a program
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed program: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Program has no PROGRAM_START instruction")]
    MissingProgramStart,

    #[error("PROGRAM_START at {index} is not the last of {len} instructions")]
    ProgramStartNotLast { index: usize, len: usize },
}

/// An instruction stream as produced by the compiler
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Decode and validate a JSON-encoded program
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        let program: Program = serde_json::from_str(json)?;
        program.validate()?;
        Ok(program)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the compiler's framing contract: exactly one PROGRAM_START, last.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let len = self.instructions.len();
        match self
            .instructions
            .iter()
            .position(|i| i.opcode() == OpCode::ProgramStart)
        {
            None => Err(DecodeError::MissingProgramStart),
            Some(index) if index + 1 != len => Err(DecodeError::ProgramStartNotLast { index, len }),
            Some(_) => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Assembles a program in the shape the compiler emits:
/// `CONS_SIDE_EFFECTS`, then per statement its expression code followed by
/// `APPEND_SIDE_EFFECT`, then `PROGRAM_START`.
#[derive(Debug)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            instructions: vec![Instruction::ConsSideEffects],
        }
    }

    /// Append a statement: `code` must leave exactly one value on the stack.
    pub fn statement(mut self, node: Node, code: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(code);
        self.instructions.push(Instruction::append_side_effect(node));
        self
    }

    /// Append instructions that leave the stack unchanged overall
    pub fn raw(mut self, code: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(code);
        self
    }

    pub fn build(mut self) -> Program {
        self.instructions.push(Instruction::ProgramStart);
        Program::new(self.instructions)
    }
}
