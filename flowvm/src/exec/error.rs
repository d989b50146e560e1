// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::semantic::AnalysisError;
use std::fmt;
use thiserror::Error;

/// Error classification carried by every [`ExecutionError`].
///
/// `Inherit` is only ever used on wrapping errors; it means "report the code
/// of whatever I wrap".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Inherit,
    Internal,
    Invalid,
    NotFound,
    Canceled,
    ResourceExhausted,
    Unimplemented,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Code::Inherit => "inherit",
            Code::Internal => "internal",
            Code::Invalid => "invalid",
            Code::NotFound => "not found",
            Code::Canceled => "canceled",
            Code::ResourceExhausted => "resource exhausted",
            Code::Unimplemented => "unimplemented",
        };
        f.write_str(name)
    }
}

/// Execution errors
#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("undefined identifier {0:?}")]
    UndefinedIdentifier(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Specification error: {0}")]
    SpecificationError(String),

    #[error("Planning error: {0}")]
    PlanningError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Memory limit exceeded: requested {requested} bytes, limit {limit} bytes")]
    MemoryLimitExceeded { limit: usize, requested: usize },

    #[error("query canceled")]
    Canceled,

    #[error("{context}: {source}")]
    Wrapped {
        code: Code,
        context: String,
        #[source]
        source: Box<ExecutionError>,
    },
}

impl ExecutionError {
    /// Wrap this error with additional context.
    pub fn wrap(self, code: Code, context: impl Into<String>) -> Self {
        ExecutionError::Wrapped {
            code,
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The effective code of this error, resolving `Inherit` through wrappers.
    pub fn code(&self) -> Code {
        match self {
            ExecutionError::UndefinedIdentifier(_) => Code::Invalid,
            ExecutionError::Analysis(_) => Code::Invalid,
            ExecutionError::SpecificationError(_) => Code::Invalid,
            ExecutionError::PlanningError(_) => Code::Invalid,
            ExecutionError::RuntimeError(_) => Code::Internal,
            ExecutionError::UnsupportedOperator(_) => Code::Unimplemented,
            ExecutionError::TypeError(_) => Code::Invalid,
            ExecutionError::Internal(_) => Code::Internal,
            ExecutionError::MemoryLimitExceeded { .. } => Code::ResourceExhausted,
            ExecutionError::Canceled => Code::Canceled,
            ExecutionError::Wrapped {
                code: Code::Inherit,
                source,
                ..
            } => source.code(),
            ExecutionError::Wrapped { code, .. } => *code,
        }
    }

    /// The innermost error, skipping every wrapping layer.
    pub fn root_cause(&self) -> &ExecutionError {
        match self {
            ExecutionError::Wrapped { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The analyzer error this error carries, if any, however deeply wrapped.
    pub fn analysis_error(&self) -> Option<&AnalysisError> {
        match self.root_cause() {
            ExecutionError::Analysis(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.code() == Code::Canceled
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::SourceLocation;

    #[test]
    fn test_inherit_resolves_inner_code() {
        let err = ExecutionError::UndefinedIdentifier("y".to_string())
            .wrap(Code::Inherit, "error in query specification while starting program");
        assert_eq!(err.code(), Code::Invalid);

        let err = ExecutionError::Canceled.wrap(Code::Inherit, "outer");
        assert!(err.is_canceled());
    }

    #[test]
    fn test_explicit_code_overrides_inner() {
        let err = ExecutionError::PlanningError("bad".to_string()).wrap(Code::Internal, "ctx");
        assert_eq!(err.code(), Code::Internal);
    }

    #[test]
    fn test_wrapped_message_includes_context() {
        let err = ExecutionError::SpecificationError("duplicate yield".to_string())
            .wrap(Code::Inherit, "while starting");
        assert_eq!(
            err.to_string(),
            "while starting: Specification error: duplicate yield"
        );
    }

    #[test]
    fn test_analysis_error_survives_wrapping() {
        let analysis = AnalysisError::new(
            "expected expression",
            Some(SourceLocation { line: 1, column: 5 }),
        );
        let err = ExecutionError::from(analysis.clone())
            .wrap(Code::Inherit, "first")
            .wrap(Code::Inherit, "second");

        assert_eq!(err.analysis_error(), Some(&analysis));
        assert_eq!(err.code(), Code::Invalid);
    }
}
