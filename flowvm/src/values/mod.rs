// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runtime values, scopes, and stream values

pub mod scope;
pub mod table;
pub mod value;

pub use scope::Scope;
pub use table::{CompareOp, OperationSpec, Predicate, Record, Table, TableObject, TimeBound};
pub use value::{FunctionValue, Value};
