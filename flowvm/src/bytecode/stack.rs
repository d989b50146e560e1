// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution stack
//!
//! Holds two kinds of frames: single values and side-effect lists. The
//! compiler guarantees every pop finds the kind it expects; when it doesn't,
//! the instruction stream is corrupt and the machine panics.

use crate::semantic::Node;
use crate::values::Value;

/// A top-level evaluation result paired with the statement that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SideEffect {
    pub node: Node,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Value(Value),
    SideEffects(Vec<SideEffect>),
}

impl Frame {
    fn kind(&self) -> &'static str {
        match self {
            Frame::Value(_) => "value",
            Frame::SideEffects(_) => "side-effect list",
        }
    }
}

#[derive(Debug, Default)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push_value(&mut self, value: Value) {
        self.frames.push(Frame::Value(value));
    }

    pub fn push_side_effects(&mut self, side_effects: Vec<SideEffect>) {
        self.frames.push(Frame::SideEffects(side_effects));
    }

    /// Pop a frame of either kind
    pub fn pop(&mut self) -> Frame {
        match self.frames.pop() {
            Some(frame) => frame,
            None => panic!("bytecode execution stack underflow"),
        }
    }

    pub fn pop_value(&mut self) -> Value {
        match self.pop() {
            Frame::Value(value) => value,
            other => panic!(
                "bytecode execution stack: expected value frame, found {}",
                other.kind()
            ),
        }
    }

    pub fn pop_side_effects(&mut self) -> Vec<SideEffect> {
        match self.pop() {
            Frame::SideEffects(side_effects) => side_effects,
            other => panic!(
                "bytecode execution stack: expected side-effect list frame, found {}",
                other.kind()
            ),
        }
    }

    pub fn panic_if_not_empty(&self) {
        if !self.frames.is_empty() {
            panic!(
                "bytecode execution stack was not empty: {} frame(s) left",
                self.frames.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push_side_effects(Vec::new());
        stack.push_value(Value::Int(1));
        assert_eq!(stack.len(), 2);

        assert_eq!(stack.pop_value(), Value::Int(1));
        assert!(stack.pop_side_effects().is_empty());
        stack.panic_if_not_empty();
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_underflow_panics() {
        Stack::new().pop_value();
    }

    #[test]
    #[should_panic(expected = "expected value frame")]
    fn test_kind_mismatch_panics() {
        let mut stack = Stack::new();
        stack.push_side_effects(Vec::new());
        stack.pop_value();
    }

    #[test]
    #[should_panic(expected = "not empty")]
    fn test_residual_frame_panics() {
        let mut stack = Stack::new();
        stack.push_value(Value::Null);
        stack.panic_if_not_empty();
    }
}
