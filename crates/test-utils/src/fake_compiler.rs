use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cachify::compiler::{CompileFailure, CompileFuture, CompileRequest, CompiledSource, Compiler};

/// A fake compiler that:
/// - records every request and counts calls
/// - "compiles" by rewriting `let ` to `var ` and prefixing a banner
/// - appends a source-map marker when source maps are enabled
/// - fails for any source containing the configured marker
/// - optionally sleeps, to exercise single-flight and pool bounds
#[derive(Clone, Default)]
pub struct FakeCompiler {
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompileRequest>>>,
    fail_marker: Option<String>,
    delay: Option<Duration>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any source containing `marker`, with a diagnostic naming it.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of compiles observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompileRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// What this compiler produces for `source` with source maps off.
    pub fn expected_output(source: &str) -> String {
        format!("/* compiled */\n{}", source.replace("let ", "var "))
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, request: CompileRequest) -> CompileFuture {
        let this = self.clone();

        Box::pin(async move {
            this.calls.fetch_add(1, Ordering::SeqCst);
            this.requests.lock().unwrap().push(request.clone());

            let now = this.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            this.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = this.delay {
                tokio::time::sleep(delay).await;
            }

            this.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(marker) = &this.fail_marker {
                if request.source.contains(marker.as_str()) {
                    return Err(CompileFailure::new(format!(
                        "{}:1:1: Unexpected token {}",
                        request.file.display(),
                        marker
                    )));
                }
            }

            let mut code = Self::expected_output(&request.source);
            if request.options.source_maps() {
                code.push_str(&format!(
                    "\n//# sourceRoot={} sources={}",
                    request.options.source_root_for(&request.file).display(),
                    request.options.relative_source(&request.file)
                ));
            }
            Ok(CompiledSource::new(code))
        })
    }
}
