// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Running queries
//!
//! The query handle returned by the stack machine, its cancel trigger,
//! execution span and the relay tasks that feed it.

pub mod cancel;
pub mod handle;
pub(crate) mod relay;
pub mod span;

pub use cancel::{CancelTrigger, Interrupt};
pub use handle::Query;
pub use relay::ResultStream;
pub use span::ExecutionSpan;
