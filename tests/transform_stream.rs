// tests/transform_stream.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use cachify::cache::CompilationCache;
use cachify::config::TransformOptions;
use cachify::engine::{StreamState, TransformEngine};
use cachify_test_utils::fake_compiler::FakeCompiler;
use cachify_test_utils::{init_tracing, with_timeout};
use serde_json::json;

type TestResult = Result<(), Box<dyn Error>>;

/// Engine over `/proj` with source maps off, so output is predictable.
fn engine_with(compiler: FakeCompiler, cache: Arc<CompilationCache>) -> TransformEngine {
    let options = TransformOptions::builder()
        .include_runtime(false)
        .compiler_override("source_maps", json!(false))
        .build()
        .unwrap()
        .bind(Path::new("/proj"));
    TransformEngine::from_options(&options, Arc::new(compiler), cache)
}

#[tokio::test]
async fn non_matching_file_passes_through_unchanged() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let engine = engine_with(compiler.clone(), Arc::new(CompilationCache::new()));

    let mut stream = engine.create_transform("/proj/styles/site.css");
    stream.write("body {").await?;
    stream.write(" color: red; ").await?;
    stream.write("}").await?;

    let out = with_timeout(stream.read_to_end()).await?;

    assert_eq!(&out[..], b"body { color: red; }");
    assert_eq!(stream.state(), StreamState::Emitted { from_cache: false });
    assert!(stream.state().is_terminal());
    assert_eq!(compiler.calls(), 0);
    assert!(engine.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn pass_through_forwards_chunks_before_end_of_input() -> TestResult {
    init_tracing();

    let engine = engine_with(FakeCompiler::new(), Arc::new(CompilationCache::new()));
    let stream = engine.create_transform("/proj/data.json");
    let (sink, mut source) = stream.split();
    let sink = sink.expect("fresh stream has a sink");

    sink.write("{\"a\":").await?;
    let first = with_timeout(source.next()).await.expect("chunk")?;
    assert_eq!(&first[..], b"{\"a\":");

    sink.write("1}").await?;
    sink.end();

    let rest = with_timeout(source.read_to_end()).await?;
    assert_eq!(&rest[..], b"1}");
    Ok(())
}

#[tokio::test]
async fn unchanged_content_is_served_from_cache_until_it_changes() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let cache = Arc::new(CompilationCache::new());
    let engine = engine_with(compiler.clone(), Arc::clone(&cache));

    let o1 = with_timeout(engine.transform("/proj/a.js", "let x = 1;")).await?;
    assert_eq!(compiler.calls(), 1);
    assert_eq!(
        String::from_utf8(o1.to_vec())?,
        FakeCompiler::expected_output("let x = 1;")
    );

    let mut again = engine.create_transform("/proj/a.js");
    again.write("let x = 1;").await?;
    let cached = with_timeout(again.read_to_end()).await?;
    assert_eq!(cached, o1);
    assert_eq!(compiler.calls(), 1);
    assert_eq!(again.state(), StreamState::Emitted { from_cache: true });

    let o2 = with_timeout(engine.transform("/proj/a.js", "let x = 2;")).await?;
    assert_eq!(compiler.calls(), 2);
    assert_ne!(o2, o1);
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[tokio::test]
async fn chunk_boundaries_do_not_affect_output_or_cache_key() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let engine = engine_with(compiler.clone(), Arc::new(CompilationCache::new()));

    let whole = with_timeout(engine.transform("/proj/b.js", "let a = 1;\nlet b = 2;\n")).await?;

    let mut stream = engine.create_transform("/proj/b.js");
    for chunk in ["let a", " = 1;\n", "let b = ", "2;\n"] {
        stream.write(chunk).await?;
    }
    let chunked = with_timeout(stream.read_to_end()).await?;

    assert_eq!(chunked, whole);
    assert_eq!(compiler.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_matching_file_still_compiles() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let engine = engine_with(compiler.clone(), Arc::new(CompilationCache::new()));

    let mut stream = engine.create_transform("/proj/empty.js");
    let out = with_timeout(stream.read_to_end()).await?;

    assert_eq!(String::from_utf8(out.to_vec())?, FakeCompiler::expected_output(""));
    assert_eq!(compiler.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn compile_failure_is_a_single_error_and_leaves_cache_alone() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new().failing_on("@@");
    let cache = Arc::new(CompilationCache::new());
    let engine = engine_with(compiler.clone(), Arc::clone(&cache));

    let good = with_timeout(engine.transform("/proj/a.js", "let x = 1;")).await?;

    let mut stream = engine.create_transform("/proj/a.js");
    stream.write("let x = @@;").await?;
    stream.end();

    let first = with_timeout(stream.next()).await.expect("an item");
    let err = first.expect_err("compile should fail");
    assert!(err.is_compile_error());
    assert_eq!(err.to_string(), "/proj/a.js:1:1: Unexpected token @@");

    // Nothing follows the error.
    assert!(with_timeout(stream.next()).await.is_none());
    assert_eq!(stream.state(), StreamState::Failed);
    assert!(stream.state().is_terminal());

    // Prior entry still serves the old content without recompiling.
    let calls = compiler.calls();
    let again = with_timeout(engine.transform("/proj/a.js", "let x = 1;")).await?;
    assert_eq!(again, good);
    assert_eq!(compiler.calls(), calls);
    Ok(())
}

#[tokio::test]
async fn failed_file_recompiles_on_next_attempt() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new().failing_on("@@");
    let engine = engine_with(compiler.clone(), Arc::new(CompilationCache::new()));

    assert!(engine.transform("/proj/c.js", "@@").await.is_err());
    assert!(engine.transform("/proj/c.js", "@@").await.is_err());

    assert_eq!(compiler.calls(), 2);
    assert!(engine.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn non_utf8_source_fails_without_calling_compiler() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let engine = engine_with(compiler.clone(), Arc::new(CompilationCache::new()));

    let err = with_timeout(engine.transform("/proj/bin.js", vec![0xff, 0xfe, 0x00]))
        .await
        .expect_err("invalid UTF-8 should fail");

    assert!(err.is_compile_error());
    assert!(err.to_string().contains("not valid UTF-8"));
    assert_eq!(compiler.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn write_after_end_is_rejected() -> TestResult {
    init_tracing();

    let engine = engine_with(FakeCompiler::new(), Arc::new(CompilationCache::new()));
    let mut stream = engine.create_transform("/proj/a.js");
    assert!(!stream.state().is_terminal());
    stream.end();

    assert!(stream.write("late").await.is_err());
    Ok(())
}

#[tokio::test]
async fn exclude_globs_and_custom_pattern_select_files() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let options = TransformOptions::builder()
        .file_pattern(r"\.(js|mjs)$")
        .exclude("vendor/**")
        .include_runtime(false)
        .build()?
        .bind(Path::new("/proj"));
    let engine = TransformEngine::from_options(
        &options,
        Arc::new(compiler.clone()),
        Arc::new(CompilationCache::new()),
    );

    assert!(engine.matches(Path::new("/proj/src/a.mjs")));
    assert!(engine.matches(Path::new("/proj/src/b.js")));
    assert!(!engine.matches(Path::new("/proj/vendor/jquery.js")));

    let vendored = with_timeout(engine.transform("/proj/vendor/jquery.js", "let $ = 1;")).await?;
    assert_eq!(&vendored[..], b"let $ = 1;");
    assert_eq!(compiler.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn source_map_options_reach_the_compiler() -> TestResult {
    init_tracing();

    let compiler = FakeCompiler::new();
    let options = TransformOptions::builder()
        .include_runtime(false)
        .source_root("src")
        .compiler_override("blockBinding", json!(true))
        .build()?
        .bind(Path::new("/proj"));
    let engine = TransformEngine::from_options(
        &options,
        Arc::new(compiler.clone()),
        Arc::new(CompilationCache::new()),
    );

    let out = with_timeout(engine.transform("/proj/src/lib/d.js", "let d;")).await?;
    let out = String::from_utf8(out.to_vec())?;
    assert!(out.ends_with("//# sourceRoot=/proj/src sources=lib/d.js"));

    let requests = compiler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].options.overrides.get("blockBinding"), Some(&json!(true)));
    Ok(())
}
