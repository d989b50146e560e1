// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Semantic tree references
//!
//! The analyzer that produces the semantic tree lives outside this crate.
//! What the execution core needs from it is a way to identify the source
//! expression a side effect came from, and the analyzer's structured error
//! type so it can be carried through unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A top-level statement of the evaluated program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// A bare expression whose value is a program result
    ExpressionStatement {
        /// Source text of the expression, for diagnostics
        text: String,
        location: Option<SourceLocation>,
    },
    /// `name = expr`
    VariableAssignment {
        name: String,
        location: Option<SourceLocation>,
    },
    /// `option name = expr`
    OptionStatement {
        name: String,
        location: Option<SourceLocation>,
    },
}

impl Node {
    pub fn expression(text: impl Into<String>) -> Self {
        Node::ExpressionStatement {
            text: text.into(),
            location: None,
        }
    }

    pub fn is_expression_statement(&self) -> bool {
        matches!(self, Node::ExpressionStatement { .. })
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Node::ExpressionStatement { location, .. }
            | Node::VariableAssignment { location, .. }
            | Node::OptionStatement { location, .. } => *location,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::ExpressionStatement { text, .. } => write!(f, "{}", text),
            Node::VariableAssignment { name, .. } => write!(f, "{} = ...", name),
            Node::OptionStatement { name, .. } => write!(f, "option {} = ...", name),
        }
    }
}

/// Structured error reported by the analyzer
///
/// Distinct from a generic execution error: callers that print errors to a
/// user render this one with its location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.pretty())]
pub struct AnalysisError {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }

    /// Render as `error @line:col: message`
    pub fn pretty(&self) -> String {
        match self.location {
            Some(loc) => format!("error @{}: {}", loc, self.message),
            None => format!("error: {}", self.message),
        }
    }
}
