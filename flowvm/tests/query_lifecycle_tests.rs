//! Query handle lifecycle tests: cancellation, completion and statistics

#[path = "testutils/mod.rs"]
mod testutils;

use flowvm::exec::{ExecutionDependencies, Metadata};
use flowvm::values::OperationSpec;
use flowvm::{Engine, EngineConfig, Scope, Value};
use std::sync::Arc;
use testutils::scripted_executor::ScriptedExecutor;
use testutils::test_fixture::{now, series, stream, TestFixture};
use tokio::sync::oneshot;

fn scripted(executor: ScriptedExecutor) -> Engine {
    Engine::new(EngineConfig::default())
        .unwrap()
        .with_executor(Arc::new(executor))
}

fn metadata(key: &str, value: i64) -> Metadata {
    [(key, value)].into_iter().collect()
}

#[tokio::test(flavor = "current_thread")]
async fn test_cancel_before_any_result_is_relayed() {
    let fixture = TestFixture::new();
    let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1))]);

    let mut query = fixture.start(&program, &scope).unwrap();
    query.cancel();
    query.done().await;

    assert!(query.err().unwrap().is_canceled());
    assert!(query.next_result().await.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn test_cancel_with_result_offered_but_not_taken() {
    let fixture = TestFixture::new();
    let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1))]);

    let mut query = fixture.start(&program, &scope).unwrap();
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    query.cancel();
    query.done().await;

    assert!(query.err().unwrap().is_canceled());
    assert!(query.next_result().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_unread_query_on_worker_pool() {
    for _ in 0..16 {
        let fixture = TestFixture::new();
        let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1))]);

        let mut query = fixture.start(&program, &scope).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        query.cancel();
        query.done().await;

        assert!(query.err().unwrap().is_canceled());
        assert!(query.next_result().await.is_none());
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_done_twice_keeps_error() {
    let fixture = TestFixture::new();
    let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1))]);

    let mut query = fixture.start(&program, &scope).unwrap();
    query.cancel();
    query.done().await;
    let first = query.err().map(|e| e.to_string());
    assert!(query.is_done());

    query.done().await;
    let second = query.err().map(|e| e.to_string());
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_metadata_batches_merged() {
    for _ in 0..16 {
        let engine = scripted(ScriptedExecutor {
            batches: vec![metadata("a", 1), metadata("b", 2)],
            allocate: 0,
        });
        let mut query = engine
            .execute(&flowvm::ProgramBuilder::new().build(), &Scope::new(), now())
            .unwrap();
        assert!(query.next_result().await.is_none());
        query.done().await;

        let stats = query.statistics();
        assert_eq!(stats.metadata.get("a"), Some(&[serde_json::json!(1)][..]));
        assert_eq!(stats.metadata.get("b"), Some(&[serde_json::json!(2)][..]));
    }
}

#[tokio::test]
async fn test_dependency_metadata_and_allocator_snapshot() {
    let engine = scripted(ScriptedExecutor {
        batches: vec![metadata("executor", 1)],
        allocate: 512,
    })
    .with_dependencies(ExecutionDependencies::new().with_metadata(metadata("caller", 7)));

    let mut query = engine
        .execute(&flowvm::ProgramBuilder::new().build(), &Scope::new(), now())
        .unwrap();
    assert_eq!(query.statistics().max_allocated, 0);
    query.done().await;

    let stats = query.statistics();
    assert_eq!(stats.max_allocated, 512);
    assert_eq!(stats.total_allocated, 512);
    assert!(stats.metadata.contains_key("caller"));
    assert!(stats.metadata.contains_key("executor"));
    assert!(stats.metadata.contains_key(flowvm::bytecode::QUERY_PLAN_KEY));
}

#[tokio::test]
async fn test_shared_trigger_cancels_query() {
    let fixture = TestFixture::new();
    let value = stream(series(&[1, 2, 3]), vec![OperationSpec::Yield { name: "r".into() }]);
    let (program, scope) = TestFixture::program_for(&[("q", value)]);

    let mut query = fixture.start(&program, &scope).unwrap();
    let trigger = query.cancel_trigger();
    let (interrupt, signal) = oneshot::channel::<()>();
    let watcher = trigger.cancel_on(signal);

    interrupt.send(()).unwrap();
    assert!(watcher.await.unwrap());
    assert!(!trigger.is_armed());

    // the API path now finds nothing left to cancel
    query.cancel();
    query.done().await;
    assert!(query.is_done());
}

#[tokio::test]
async fn test_parent_token_cancels_queries() {
    let token = tokio_util::sync::CancellationToken::new();
    let engine = Engine::default().with_token(token.clone());
    let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1))]);

    let mut query = engine.execute(&program, &scope, now()).unwrap();
    token.cancel();
    query.done().await;
    assert!(query.err().unwrap().is_canceled());
}

#[tokio::test]
async fn test_completed_query_has_no_error() {
    let fixture = TestFixture::new();
    let (program, scope) = TestFixture::program_for(&[("x", Value::Int(1)), ("y", Value::Bool(true))]);

    let outcome = fixture.run(&program, &scope).await.unwrap();
    assert_eq!(outcome.tables.len(), 2);
    assert!(outcome.query.err().is_none());
    assert!(outcome.query.is_done());
}
