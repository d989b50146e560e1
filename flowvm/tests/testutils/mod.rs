//! Test utilities for flowvm integration tests
//!
//! - TestFixture: an engine plus helpers to build programs and drain queries
//! - ScriptedExecutor: an executor that only emits canned metadata

pub mod scripted_executor;
pub mod test_fixture;
