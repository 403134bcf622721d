// src/compiler/mod.rs

//! Boundary to the external source-to-source compiler.
//!
//! The engine never decides *how* to compile. It hands a [`CompileRequest`]
//! to a [`Compiler`] and gets back either the compiled text or a
//! [`CompileFailure`] whose message is surfaced verbatim.
//!
//! - [`command`] provides [`CommandCompiler`], which runs a configured
//!   command with the source on stdin.
//! - Tests provide their own `Compiler` that, for example, counts calls.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;

use crate::paths::{relative_str, slash_str};

pub mod command;

pub use command::CommandCompiler;

/// Override key that toggles source-map generation.
pub const SOURCE_MAPS_KEY: &str = "source_maps";

/// Compiler feature overrides, passed through untouched.
pub type CompilerOverrides = BTreeMap<String, serde_json::Value>;

/// Diagnostic reported by the compiler for one file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CompileFailure {
    pub message: String,
}

impl CompileFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Successful compiler output.
///
/// Any source map is embedded in `code` by the compiler itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSource {
    pub code: String,
}

impl CompiledSource {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Options forwarded with every compile call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    pub overrides: CompilerOverrides,
    /// Root for relative paths inside generated source maps. When unset,
    /// the compiled file's own directory is used.
    pub source_root: Option<PathBuf>,
}

impl CompilerOptions {
    /// Whether source maps should be generated (`source_maps` override,
    /// default `true`).
    pub fn source_maps(&self) -> bool {
        self.overrides
            .get(SOURCE_MAPS_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    /// Directory that source-map `sources` entries are relative to.
    pub fn source_root_for(&self, file: &Path) -> PathBuf {
        match &self.source_root {
            Some(root) => root.clone(),
            None => file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    /// Path recorded for `file` in the source map's `sources`.
    ///
    /// Relative to the configured source root when one is set and contains
    /// the file; otherwise just the file name.
    pub fn relative_source(&self, file: &Path) -> String {
        if let Some(root) = &self.source_root {
            if let Some(rel) = relative_str(root, file) {
                return rel;
            }
        }
        file.file_name()
            .map(|n| slash_str(Path::new(n)))
            .unwrap_or_else(|| slash_str(file))
    }
}

/// One compile call: file identity, its full source, and the options.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub file: PathBuf,
    pub source: String,
    pub options: CompilerOptions,
}

pub type CompileFuture =
    Pin<Box<dyn Future<Output = Result<CompiledSource, CompileFailure>> + Send + 'static>>;

/// Trait abstracting how a file is compiled.
///
/// A single call is a single attempt: implementations must not retry.
pub trait Compiler: Send + Sync {
    fn compile(&self, request: CompileRequest) -> CompileFuture;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_maps_default_on() {
        assert!(CompilerOptions::default().source_maps());
    }

    #[test]
    fn source_maps_override_off() {
        let mut opts = CompilerOptions::default();
        opts.overrides
            .insert(SOURCE_MAPS_KEY.to_string(), serde_json::Value::Bool(false));
        assert!(!opts.source_maps());
    }

    #[test]
    fn source_root_falls_back_to_file_dir() {
        let opts = CompilerOptions::default();
        let file = Path::new("/proj/src/features/iterators.js");
        assert_eq!(opts.source_root_for(file), PathBuf::from("/proj/src/features"));
        assert_eq!(opts.relative_source(file), "iterators.js");
    }

    #[test]
    fn configured_source_root_is_used() {
        let opts = CompilerOptions {
            source_root: Some(PathBuf::from("/proj/src")),
            ..Default::default()
        };
        let file = Path::new("/proj/src/features/iterators.js");
        assert_eq!(opts.source_root_for(file), PathBuf::from("/proj/src"));
        assert_eq!(opts.relative_source(file), "features/iterators.js");
    }
}
