// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stack machine
//!
//! Runs a compiled program to its `PROGRAM_START` instruction, then hands
//! the collected side effects to the specification builder, the planner
//! and the executor. The machine itself never suspends; concurrency begins
//! with the relay tasks spawned for the returned [`Query`].

use crate::bytecode::instruction::Instruction;
use crate::bytecode::program::Program;
use crate::bytecode::stack::{SideEffect, Stack};
use crate::exec::{Code, ExecutionContext, ExecutionError, MemoryAllocator, Result, Statistics};
use crate::plan::{formatted, Planner, PlannerBuilder};
use crate::query::handle::QueryParts;
use crate::query::{ExecutionSpan, Query};
use crate::spec;
use crate::values::Scope;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Statistics key holding the formatted physical plan
pub const QUERY_PLAN_KEY: &str = "flowvm/query-plan";

/// Execute `program` against `scope`.
///
/// Must be called from within a Tokio runtime. Returns a running query, or
/// the error that stopped the program before it started.
///
/// # Panics
/// On a corrupt instruction stream: stack underflow, a frame of the wrong
/// kind, a non-empty stack or trailing instructions at `PROGRAM_START`, or
/// a stream without `PROGRAM_START`.
pub fn execute(
    ctx: &ExecutionContext,
    alloc: Arc<MemoryAllocator>,
    now: DateTime<Utc>,
    program: &Program,
    scope: &Scope,
) -> Result<Query> {
    let mut stack = Stack::new();
    let mut instructions = program.instructions.iter().enumerate();

    while let Some((pc, instruction)) = instructions.next() {
        log::debug!("{:>4}  {}", pc, instruction);
        match instruction {
            Instruction::Call(call) => {
                for _ in 0..call.nargs {
                    stack.pop_value();
                }
                stack.pop_value();
                stack.push_value(call.result.clone());
            }
            Instruction::ScopeLookup { name } => {
                let value = scope
                    .lookup(name)
                    .ok_or_else(|| ExecutionError::UndefinedIdentifier(name.clone()))?;
                stack.push_value(value.clone());
            }
            Instruction::Pop => {
                stack.pop_value();
            }
            Instruction::ConsSideEffects => stack.push_side_effects(Vec::new()),
            Instruction::LoadValue { value } => stack.push_value(value.clone()),
            Instruction::AppendSideEffect { node } => {
                let value = stack.pop_value();
                let mut side_effects = stack.pop_side_effects();
                side_effects.push(SideEffect {
                    node: node.clone(),
                    value,
                });
                stack.push_side_effects(side_effects);
            }
            Instruction::ProgramStart => {
                let side_effects = stack.pop_side_effects();
                stack.panic_if_not_empty();
                if let Some((next, trailing)) = instructions.next() {
                    panic!(
                        "bytecode instruction {} ({}) follows PROGRAM_START",
                        next,
                        trailing.opcode()
                    );
                }
                return start_program(ctx, alloc, now, &side_effects);
            }
        }
    }

    panic!("bytecode ended without PROGRAM_START")
}

/// Specification, plan, executor, then the query handle with its relays
fn start_program(
    ctx: &ExecutionContext,
    alloc: Arc<MemoryAllocator>,
    now: DateTime<Utc>,
    side_effects: &[SideEffect],
) -> Result<Query> {
    log::info!("starting program with {} side effects", side_effects.len());

    let spec = spec::from_evaluation(side_effects, now).map_err(|e| {
        e.wrap(
            Code::Inherit,
            "error in query specification while starting program",
        )
    })?;

    let planner = PlannerBuilder::new()
        .with_options(&ctx.plan_options())
        .build();
    let plan = planner
        .plan(&spec)
        .map_err(|e| e.wrap(Code::Inherit, "error in building plan while starting program"))?;

    let ctx = ctx.child();
    let id = Uuid::new_v4();
    let span = ExecutionSpan::start(id);

    let (results, metadata) = match ctx.executor().execute(&ctx, &plan, alloc.clone()) {
        Ok(output) => output,
        Err(e) => {
            span.finish();
            return Err(e);
        }
    };

    let mut statistics = Statistics::default();
    if let Some(deps) = ctx.dependencies() {
        statistics.metadata.add_all(&deps.metadata);
    }
    statistics
        .metadata
        .add(QUERY_PLAN_KEY, formatted(&plan).to_string());

    log::debug!("query {} running {} results", id, results.len());
    Ok(Query::start(QueryParts {
        id,
        token: ctx.token().clone(),
        results,
        metadata,
        statistics,
        alloc,
        span,
    }))
}
