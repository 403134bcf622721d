// src/engine/mod.rs

//! Per-file transform orchestration.
//!
//! [`TransformEngine::create_transform`] opens a [`TransformStream`] for one
//! file and spawns a worker that drives it:
//!
//! - files rejected by the [`PatternFilter`] are forwarded chunk by chunk,
//!   unchanged;
//! - matching files are buffered until end-of-input, then resolved through
//!   [`CompilationCache::get_or_compile`]. A miss submits the compile to a
//!   bounded pool (at most `jobs` compiles in flight).
//!
//! Output is emitted only after end-of-input. A compile failure is emitted as
//! a single error item followed by end-of-output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, warn};

use crate::cache::{CacheStatus, CompilationCache};
use crate::compiler::{CompileFailure, CompileRequest, Compiler, CompilerOptions};
use crate::config::TransformOptions;
use crate::errors::{CachifyError, Result};
use crate::filter::PatternFilter;
use crate::paths::absolutize;

pub mod stream;

pub use stream::{StreamItem, StreamState, TransformSink, TransformSource, TransformStream};

/// Bounded input buffer per stream; output is unbounded so a caller that
/// writes everything before reading never stalls the worker.
const INPUT_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct TransformEngine {
    filter: PatternFilter,
    cache: Arc<CompilationCache>,
    compiler: Arc<dyn Compiler>,
    options: CompilerOptions,
    pool: Arc<Semaphore>,
    jobs: usize,
    /// Anchor for relative file paths. Falls back to the working directory.
    basedir: Option<PathBuf>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("filter", &self.filter)
            .field("options", &self.options)
            .field("jobs", &self.jobs)
            .field("basedir", &self.basedir)
            .finish_non_exhaustive()
    }
}

impl TransformEngine {
    /// `jobs` is clamped to at least one worker.
    pub fn new(
        filter: PatternFilter,
        cache: Arc<CompilationCache>,
        compiler: Arc<dyn Compiler>,
        options: CompilerOptions,
        jobs: usize,
    ) -> Self {
        let jobs = jobs.max(1);
        Self {
            filter,
            cache,
            compiler,
            options,
            pool: Arc::new(Semaphore::new(jobs)),
            jobs,
            basedir: None,
        }
    }

    /// Resolve relative file paths against `dir` instead of the working
    /// directory. A relative `dir` is itself anchored to the working
    /// directory.
    pub fn with_basedir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.basedir = Some(absolutize(&current_dir(), &dir.into()));
        self
    }

    /// Build an engine from validated options.
    pub fn from_options(
        options: &TransformOptions,
        compiler: Arc<dyn Compiler>,
        cache: Arc<CompilationCache>,
    ) -> Self {
        let engine = Self::new(
            options.filter().clone(),
            cache,
            compiler,
            options.compiler_options(),
            options.jobs,
        );
        match &options.basedir {
            Some(dir) => engine.with_basedir(dir.clone()),
            None => engine,
        }
    }

    pub fn filter(&self) -> &PatternFilter {
        &self.filter
    }

    pub fn cache(&self) -> &Arc<CompilationCache> {
        &self.cache
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Maximum number of compiles in flight at once.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn basedir(&self) -> Option<&Path> {
        self.basedir.as_deref()
    }

    /// File identity used for filtering and as the cache key: `file` made
    /// absolute against the basedir, with `.` and `..` resolved.
    pub fn identity(&self, file: &Path) -> PathBuf {
        match &self.basedir {
            Some(dir) => absolutize(dir, file),
            None => absolutize(&current_dir(), file),
        }
    }

    /// Whether `file` would be compiled (as opposed to passed through).
    pub fn matches(&self, file: &Path) -> bool {
        self.filter.matches(&self.identity(file))
    }

    /// Open a transform stream for `file`.
    ///
    /// Must be called from within a Tokio runtime; the stream's worker is a
    /// spawned task.
    pub fn create_transform(&self, file: impl Into<PathBuf>) -> TransformStream {
        let file = self.identity(&file.into());
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(INPUT_CAPACITY);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<StreamItem>();
        let (state_tx, state_rx) = watch::channel(StreamState::Open);

        if self.filter.matches(&file) {
            debug!(file = %file.display(), "opening compiling transform");
            let engine = self.clone();
            let worker_file = file.clone();
            tokio::spawn(async move {
                engine.run_compile(worker_file, in_rx, out_tx, state_tx).await;
            });
        } else {
            debug!(file = %file.display(), "opening pass-through transform");
            let worker_file = file.clone();
            tokio::spawn(async move {
                run_pass_through(worker_file, in_rx, out_tx, state_tx).await;
            });
        }

        TransformStream::new(file, in_tx, out_rx, state_rx)
    }

    /// Transform a whole buffer in one go.
    pub async fn transform(&self, file: impl Into<PathBuf>, content: impl Into<Bytes>) -> Result<Bytes> {
        let stream = self.create_transform(file);
        stream.write(content).await?;
        stream.collect().await
    }

    async fn run_compile(
        self,
        file: PathBuf,
        mut input: mpsc::Receiver<Bytes>,
        output: mpsc::UnboundedSender<StreamItem>,
        state: watch::Sender<StreamState>,
    ) {
        set_state(&state, &file, StreamState::Buffering);

        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = input.recv().await {
            buf.extend_from_slice(&chunk);
        }
        debug!(file = %file.display(), bytes = buf.len(), "end of input");

        let result = match String::from_utf8(buf) {
            Ok(source) => self.compile_cached(&file, &source, &state).await,
            Err(e) => Err(CompileFailure::new(format!(
                "{}: source is not valid UTF-8: {e}",
                file.display()
            ))),
        };

        match result {
            Ok((compiled, status)) => {
                let from_cache = status == CacheStatus::Hit;
                if from_cache {
                    set_state(&state, &file, StreamState::Cached);
                }
                if output.send(Ok(Bytes::from(compiled))).is_err() {
                    debug!(file = %file.display(), "transform output dropped before emit");
                }
                set_state(&state, &file, StreamState::Emitted { from_cache });
            }
            Err(failure) => {
                warn!(file = %file.display(), error = %failure, "compile failed");
                if output.send(Err(CachifyError::Compile(failure))).is_err() {
                    debug!(file = %file.display(), "transform output dropped before error");
                }
                set_state(&state, &file, StreamState::Failed);
            }
        }
        // `output` drops here: end-of-output.
    }

    async fn compile_cached(
        &self,
        file: &Path,
        source: &str,
        state: &watch::Sender<StreamState>,
    ) -> std::result::Result<(String, CacheStatus), CompileFailure> {
        let out = self
            .cache
            .get_or_compile(file, source, |file, source| {
                set_state(state, &file, StreamState::Compiling);
                let pool = Arc::clone(&self.pool);
                let compiler = Arc::clone(&self.compiler);
                let options = self.options.clone();
                async move {
                    let _permit = pool
                        .acquire_owned()
                        .await
                        .map_err(|_| CompileFailure::new("compiler pool is closed"))?;
                    info!(file = %file.display(), "compiling");
                    compiler
                        .compile(CompileRequest {
                            file,
                            source,
                            options,
                        })
                        .await
                }
            })
            .await?;
        Ok((out.compiled, out.status))
    }
}

async fn run_pass_through(
    file: PathBuf,
    mut input: mpsc::Receiver<Bytes>,
    output: mpsc::UnboundedSender<StreamItem>,
    state: watch::Sender<StreamState>,
) {
    set_state(&state, &file, StreamState::PassThrough);
    while let Some(chunk) = input.recv().await {
        if output.send(Ok(chunk)).is_err() {
            debug!(file = %file.display(), "pass-through output dropped");
            break;
        }
    }
    set_state(&state, &file, StreamState::Emitted { from_cache: false });
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn set_state(state: &watch::Sender<StreamState>, file: &Path, next: StreamState) {
    debug!(file = %file.display(), state = %next, "transform state");
    state.send_replace(next);
}
