//! End-to-end program execution tests
//!
//! Programs go through the stack machine, specification builder, planner and
//! dataflow executor; results are drained through the query handle.

#[path = "testutils/mod.rs"]
mod testutils;

use flowvm::bytecode::QUERY_PLAN_KEY;
use flowvm::exec::{Code, ExecutionDependencies, ExecutionError};
use flowvm::plan::{formatted, LimitPushdownRule, MergeFiltersRule, PlanOptions, Planner, PlannerBuilder};
use flowvm::spec::from_evaluation;
use flowvm::values::{CompareOp, OperationSpec, Predicate, TableObject, TimeBound};
use flowvm::{Engine, EngineConfig, Instruction, Node, Program, ProgramBuilder, Scope, SideEffect, Value};
use std::sync::Arc;
use testutils::test_fixture::{now, series, stream, TestFixture};

const MINUTE: i64 = 60_000_000_000;

fn yield_op(name: &str) -> OperationSpec {
    OperationSpec::Yield {
        name: name.to_string(),
    }
}

#[tokio::test]
async fn test_identifier_result_is_single_value() {
    let fixture = TestFixture::new();
    let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1))]);

    let side_effects = vec![SideEffect {
        node: Node::expression("x"),
        value: Value::Int(1),
    }];
    let spec = from_evaluation(&side_effects, now()).unwrap();
    assert!(spec.operations.is_empty());

    let outcome = fixture.run(&program, &scope).await.unwrap();
    assert_eq!(outcome.tables.len(), 1);
    let table = outcome.tables["_value0"].as_ref().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.value(0, "_value"), Some(&Value::Int(1)));
    assert!(outcome.query.err().is_none());
}

#[tokio::test]
async fn test_undefined_identifier_names_it() {
    let fixture = TestFixture::new();
    let program = ProgramBuilder::new()
        .statement(Node::expression("y"), [Instruction::scope_lookup("y")])
        .build();

    let err = fixture.start(&program, &Scope::new()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ExecutionError::UndefinedIdentifier(name) if name == "y"
    ));
    assert_eq!(err.code(), Code::Invalid);
}

#[tokio::test]
async fn test_query_plan_matches_builder_output() {
    let fixture = TestFixture::new();
    let value = stream(
        series(&[1, 2, 3]),
        vec![
            OperationSpec::Range {
                start: TimeBound::Relative(-10 * MINUTE),
                stop: None,
                column: "_time".into(),
            },
            yield_op("recent"),
        ],
    );
    let node = Node::expression("from(...) |> range(start: -10m) |> yield(name: \"recent\")");
    let program = Program::new(vec![
        Instruction::ConsSideEffects,
        Instruction::load_value(value.clone()),
        Instruction::append_side_effect(node.clone()),
        Instruction::ProgramStart,
    ]);

    let spec = from_evaluation(&[SideEffect { node, value }], now()).unwrap();
    let ids: Vec<&str> = spec.operations.iter().map(|op| op.id.as_str()).collect();
    assert_eq!(ids, vec!["from0", "range1", "yield2"]);
    let expected = formatted(&PlannerBuilder::new().build().plan(&spec).unwrap()).to_string();

    let outcome = fixture.run(&program, &Scope::new()).await.unwrap();
    let stats = outcome.query.statistics();
    assert_eq!(
        stats.metadata.get(QUERY_PLAN_KEY),
        Some(&[serde_json::Value::String(expected)][..])
    );
    assert_eq!(outcome.tables["recent"].as_ref().unwrap().len(), 3);
}

#[tokio::test]
async fn test_filter_and_limit_results() {
    let fixture = TestFixture::new();
    let value = stream(
        series(&[5, 1, 7, 9, 3, 8]),
        vec![
            OperationSpec::Filter {
                predicates: vec![Predicate::new("_value", CompareOp::Gt, 4i64)],
            },
            OperationSpec::Limit { n: 2, offset: 1 },
        ],
    );
    let (program, scope) = TestFixture::program_for(&[("q", value)]);

    let outcome = fixture.run(&program, &scope).await.unwrap();
    let table = outcome.tables["_result"].as_ref().unwrap();
    let values: Vec<&Value> = (0..table.len()).filter_map(|i| table.value(i, "_value")).collect();
    assert_eq!(values, vec![&Value::Int(7), &Value::Int(9)]);

    let stats = outcome.query.statistics();
    assert_eq!(
        stats.metadata.get("flowvm/rows-produced/_result"),
        Some(&[serde_json::json!(2)][..])
    );
    assert!(stats.total_allocated > 0);
    assert!(stats.max_allocated > 0);
    assert!(stats.max_allocated <= stats.total_allocated);
}

#[tokio::test]
async fn test_shared_source_feeds_two_results() {
    let fixture = TestFixture::new();
    let source = TableObject::source(OperationSpec::From {
        rows: series(&[1, 2, 3, 4]),
    });
    let small = TableObject::pipe(
        &TableObject::pipe(
            &source,
            OperationSpec::Filter {
                predicates: vec![Predicate::new("_value", CompareOp::Le, 2i64)],
            },
        ),
        yield_op("small"),
    );
    let large = TableObject::pipe(
        &TableObject::pipe(
            &source,
            OperationSpec::Filter {
                predicates: vec![Predicate::new("_value", CompareOp::Gt, 2i64)],
            },
        ),
        yield_op("large"),
    );
    let (program, scope) = TestFixture::program_for(&[
        ("small", Value::Table(small)),
        ("large", Value::Table(large)),
    ]);

    let outcome = fixture.run(&program, &scope).await.unwrap();
    assert_eq!(outcome.tables["small"].as_ref().unwrap().len(), 2);
    assert_eq!(outcome.tables["large"].as_ref().unwrap().len(), 2);
    let plan = outcome.query.statistics().metadata.get(QUERY_PLAN_KEY).unwrap()[0].clone();
    assert!(plan.as_str().unwrap().contains("from0 -> filter1"));
}

#[tokio::test]
async fn test_duplicate_yield_names_rejected() {
    let fixture = TestFixture::new();
    let a = stream(series(&[1]), vec![yield_op("out")]);
    let b = stream(series(&[2]), vec![yield_op("out")]);
    let (program, scope) = TestFixture::program_for(&[("a", a), ("b", b)]);

    let err = fixture.start(&program, &scope).unwrap_err();
    assert!(err.to_string().starts_with("error in query specification while starting program"));
    assert!(matches!(err.root_cause(), ExecutionError::SpecificationError(_)));
}

#[tokio::test]
async fn test_two_unnamed_results_rejected() {
    let fixture = TestFixture::new();
    let a = stream(series(&[1]), vec![]);
    let b = stream(series(&[2]), vec![]);
    let (program, scope) = TestFixture::program_for(&[("a", a), ("b", b)]);

    let err = fixture.start(&program, &scope).unwrap_err();
    assert!(err.to_string().starts_with("error in building plan while starting program"));
    assert_eq!(err.code(), Code::Invalid);
}

#[tokio::test]
async fn test_memory_limit_reported_on_result() {
    let fixture = TestFixture::with_config(EngineConfig {
        memory_limit: Some(256),
        ..EngineConfig::default()
    });
    let value = stream(series(&(0..100).collect::<Vec<_>>()), vec![]);
    let (program, scope) = TestFixture::program_for(&[("big", value)]);

    let outcome = fixture.run(&program, &scope).await.unwrap();
    let err = outcome.tables["_result"].as_ref().unwrap_err();
    assert_eq!(err.code(), Code::ResourceExhausted);
    assert!(outcome.query.err().is_none());
}

#[tokio::test]
async fn test_plan_options_rewrite_visible_in_statistics() {
    let options = PlanOptions::new()
        .with_logical_rule(Arc::new(MergeFiltersRule))
        .with_physical_rule(Arc::new(LimitPushdownRule));
    let engine = Engine::new(EngineConfig::default())
        .unwrap()
        .with_dependencies(ExecutionDependencies::new().with_plan_options(options));

    let value = stream(
        series(&[1, 2, 3, 4, 5]),
        vec![
            OperationSpec::Limit { n: 4, offset: 0 },
            OperationSpec::Filter {
                predicates: vec![Predicate::new("_value", CompareOp::Gt, 1i64)],
            },
            OperationSpec::Filter {
                predicates: vec![Predicate::new("_value", CompareOp::Lt, 4i64)],
            },
            yield_op("merged"),
        ],
    );
    let (program, scope) = TestFixture::program_for(&[("q", value)]);

    let outcome = testutils::test_fixture::drain(engine.execute(&program, &scope, now()).unwrap()).await;
    let table = outcome.tables["merged"].as_ref().unwrap();
    assert_eq!(table.len(), 2);

    let stats = outcome.query.statistics();
    let plan = stats.metadata.get(QUERY_PLAN_KEY).unwrap()[0].as_str().unwrap().to_string();
    assert!(plan.contains("limit: 4, offset: 0"));
    assert!(plan.contains("r._value > 1 and r._value < 4"));
    assert!(!plan.contains("limit1"));
    assert!(!plan.contains("filter3"));
}

#[tokio::test]
async fn test_decoded_program_runs() {
    let fixture = TestFixture::new();
    let program = ProgramBuilder::new()
        .statement(Node::expression("\"hello\""), [Instruction::load_value("hello")])
        .build();
    let decoded = Program::from_json(&program.to_json().unwrap()).unwrap();
    assert_eq!(decoded, program);

    let outcome = fixture.run(&decoded, &Scope::new()).await.unwrap();
    let table = outcome.tables["_value0"].as_ref().unwrap();
    assert_eq!(table.value(0, "_value"), Some(&Value::String("hello".into())));
}

#[tokio::test]
async fn test_demo_program_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/high_values.json");
    let program = Program::from_file(path).unwrap();
    let scope = Scope::new().with("threshold", Value::Int(40));

    let outcome = TestFixture::new().run(&program, &scope).await.unwrap();
    assert_eq!(
        outcome.tables["_value0"].as_ref().unwrap().value(0, "_value"),
        Some(&Value::Int(40))
    );
    let table = outcome.tables["_result"].as_ref().unwrap();
    assert_eq!(table.columns, vec!["_value", "host"]);
    assert_eq!(table.value(0, "host"), Some(&Value::String("b".into())));
    assert_eq!(table.value(1, "host"), Some(&Value::String("c".into())));
    assert_eq!(table.len(), 2);
}
