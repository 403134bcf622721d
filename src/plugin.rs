// src/plugin.rs

//! Registration with a host bundler, plus the standalone compile entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::cache::CompilationCache;
use crate::compiler::{CompileRequest, CompiledSource, Compiler, CompilerOptions};
use crate::config::options::missing_runtime_error;
use crate::config::TransformOptions;
use crate::engine::TransformEngine;
use crate::errors::Result;
use crate::runtime::inject_runtime;

/// What the plugin needs from the bundler it plugs into.
pub trait BundleHost {
    /// The bundler's base directory; used when the options name none.
    fn basedir(&self) -> &Path;

    /// Add a module to the bundle. Returns `false` if it was already there.
    fn add_module(&mut self, path: PathBuf) -> bool;

    /// Route every discovered file through `engine`.
    fn add_transform(&mut self, engine: TransformEngine);
}

/// Register the transform on `host`.
///
/// Binds `options` to the host's basedir, injects the runtime module (when
/// enabled), and installs a [`TransformEngine`] backed by `compiler` and
/// `cache`. The engine is also returned, e.g. for tests.
pub fn register(
    host: &mut dyn BundleHost,
    options: &TransformOptions,
    compiler: Arc<dyn Compiler>,
    cache: Arc<CompilationCache>,
) -> Result<TransformEngine> {
    if options.include_runtime && options.runtime.is_none() {
        return Err(missing_runtime_error());
    }

    let bound = options.bind(host.basedir());
    inject_runtime(host, &bound);

    let engine = TransformEngine::from_options(&bound, compiler, cache);
    info!(
        pattern = %bound.filter().pattern(),
        basedir = ?bound.basedir,
        jobs = bound.jobs,
        "registered transform"
    );
    host.add_transform(engine.clone());
    Ok(engine)
}

/// Compile one file without the cache or the stream layer.
///
/// A compiler failure becomes [`CachifyError::Compile`](crate::errors::CachifyError::Compile) with the diagnostic
/// unchanged.
pub async fn compile_file(
    file: impl Into<PathBuf>,
    source: impl Into<String>,
    options: &CompilerOptions,
    compiler: &dyn Compiler,
) -> Result<CompiledSource> {
    let request = CompileRequest {
        file: file.into(),
        source: source.into(),
        options: options.clone(),
    };
    Ok(compiler.compile(request).await?)
}
