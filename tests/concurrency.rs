// tests/concurrency.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Duration;

use cachify::cache::CompilationCache;
use cachify::config::TransformOptions;
use cachify::engine::TransformEngine;
use cachify_test_utils::fake_compiler::FakeCompiler;
use cachify_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn engine_with(compiler: FakeCompiler, jobs: usize) -> TransformEngine {
    let options = TransformOptions::builder()
        .include_runtime(false)
        .jobs(jobs)
        .build()
        .unwrap()
        .bind(Path::new("/proj"));
    TransformEngine::from_options(
        &options,
        Arc::new(compiler),
        Arc::new(CompilationCache::new()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_streams_for_one_file_compile_once() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new().with_delay(Duration::from_millis(50));
    let engine = engine_with(compiler.clone(), 4);

    let mut join = JoinSet::new();
    for _ in 0..8 {
        let engine = engine.clone();
        join.spawn(async move { engine.transform("/proj/a.js", "let x = 1;").await });
    }

    let mut outputs = Vec::new();
    while let Some(res) = with_timeout(join.join_next()).await {
        outputs.push(res??);
    }

    assert_eq!(outputs.len(), 8);
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(compiler.calls(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn compiles_never_exceed_the_pool_size() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new().with_delay(Duration::from_millis(30));
    let engine = engine_with(compiler.clone(), 2);
    assert_eq!(engine.jobs(), 2);

    let mut join = JoinSet::new();
    for i in 0..6 {
        let engine = engine.clone();
        join.spawn(async move {
            engine
                .transform(format!("/proj/m{i}.js"), format!("let m{i} = {i};"))
                .await
        });
    }
    while let Some(res) = with_timeout(join.join_next()).await {
        res??;
    }

    assert_eq!(compiler.calls(), 6);
    assert!(compiler.max_in_flight() <= 2);
    assert!(compiler.max_in_flight() >= 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_files_compile_in_parallel() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new().with_delay(Duration::from_millis(100));
    let engine = engine_with(compiler.clone(), 4);

    let mut join = JoinSet::new();
    for i in 0..4 {
        let engine = engine.clone();
        join.spawn(async move {
            engine
                .transform(format!("/proj/p{i}.js"), "let p;")
                .await
        });
    }
    while let Some(res) = with_timeout(join.join_next()).await {
        res??;
    }

    assert_eq!(compiler.calls(), 4);
    assert!(compiler.max_in_flight() > 1);
    Ok(())
}
