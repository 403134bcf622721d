// src/config/options.rs

//! Validated, immutable transform options.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compiler::{CompilerOptions, CompilerOverrides};
use crate::errors::{CachifyError, Result};
use crate::filter::{compile_pattern, PatternFilter, DEFAULT_FILE_PATTERN};
use crate::paths::absolutize;

/// Snapshot of the plugin configuration.
///
/// Built once through [`TransformOptionsBuilder`] (or from a config file) and
/// never mutated afterwards. [`TransformOptions::bind`] fills in the host's
/// basedir and anchors relative paths to it.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    filter: PatternFilter,
    /// Base directory for relative paths. `None` until bound to a host.
    pub basedir: Option<PathBuf>,
    pub compiler_overrides: CompilerOverrides,
    pub include_runtime: bool,
    /// Runtime-support module. Absolute once bound.
    pub runtime: Option<PathBuf>,
    pub source_root: Option<PathBuf>,
    pub jobs: usize,
}

impl TransformOptions {
    pub fn builder() -> TransformOptionsBuilder {
        TransformOptionsBuilder::default()
    }

    pub fn filter(&self) -> &PatternFilter {
        &self.filter
    }

    /// Resolve against `host_basedir`.
    ///
    /// - `basedir` falls back to `host_basedir` and is made absolute.
    /// - `runtime` and `source_root` are made absolute against `basedir`.
    /// - the filter evaluates excludes relative to `basedir` and never
    ///   matches the runtime module.
    pub fn bind(&self, host_basedir: &Path) -> TransformOptions {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let host = absolutize(&cwd, host_basedir);
        let basedir = match &self.basedir {
            Some(dir) => absolutize(&host, dir),
            None => host,
        };

        let runtime = self.runtime.as_ref().map(|p| absolutize(&basedir, p));
        let source_root = self.source_root.as_ref().map(|p| absolutize(&basedir, p));

        let mut filter = self.filter.clone().with_root(basedir.clone());
        if let Some(runtime) = &runtime {
            filter = filter.excluding_runtime(runtime.clone());
        }

        debug!(basedir = %basedir.display(), runtime = ?runtime, "bound transform options");

        TransformOptions {
            filter,
            basedir: Some(basedir),
            compiler_overrides: self.compiler_overrides.clone(),
            include_runtime: self.include_runtime,
            runtime,
            source_root,
            jobs: self.jobs,
        }
    }

    /// Options forwarded to the compiler on every call.
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            overrides: self.compiler_overrides.clone(),
            source_root: self.source_root.clone(),
        }
    }
}

/// `include_runtime` is on but nothing says where the runtime module lives.
pub(crate) fn missing_runtime_error() -> CachifyError {
    CachifyError::config(
        "`include_runtime` is enabled but no runtime module is configured; \
         set [compiler].runtime (or `runtime(..)` on the builder) or use \
         `include_runtime = false`",
    )
}

/// Number of compile workers used when none is configured.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder applying documented defaults and validating once in `build`.
///
/// | option            | default                 |
/// |-------------------|-------------------------|
/// | `file_pattern`    | `\.js$`                 |
/// | `exclude`         | none                    |
/// | `basedir`         | host basedir            |
/// | `include_runtime` | `true`                  |
/// | `runtime`         | none (required if included) |
/// | `source_root`     | compiled file's dir     |
/// | `overrides`       | empty                   |
/// | `jobs`            | available parallelism   |
#[derive(Debug, Clone)]
pub struct TransformOptionsBuilder {
    file_pattern: String,
    exclude: Vec<String>,
    basedir: Option<PathBuf>,
    include_runtime: bool,
    runtime: Option<PathBuf>,
    source_root: Option<PathBuf>,
    overrides: CompilerOverrides,
    jobs: Option<usize>,
}

impl Default for TransformOptionsBuilder {
    fn default() -> Self {
        Self {
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            exclude: Vec::new(),
            basedir: None,
            include_runtime: true,
            runtime: None,
            source_root: None,
            overrides: CompilerOverrides::new(),
            jobs: None,
        }
    }
}

impl TransformOptionsBuilder {
    pub fn file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn exclude(mut self, glob: impl Into<String>) -> Self {
        self.exclude.push(glob.into());
        self
    }

    pub fn basedir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.basedir = Some(dir.into());
        self
    }

    pub fn include_runtime(mut self, include: bool) -> Self {
        self.include_runtime = include;
        self
    }

    pub fn runtime(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime = Some(path.into());
        self
    }

    pub fn source_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_root = Some(dir.into());
        self
    }

    pub fn compiler_override(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    pub fn compiler_overrides(mut self, overrides: CompilerOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Validate and freeze. Invalid values are rejected, never coerced.
    pub fn build(self) -> Result<TransformOptions> {
        let pattern = compile_pattern(&self.file_pattern)?;
        let filter = PatternFilter::new(pattern).with_excludes(&self.exclude)?;

        let jobs = match self.jobs {
            Some(0) => {
                return Err(CachifyError::config(
                    "`jobs` must be >= 1 (got 0)".to_string(),
                ));
            }
            Some(n) => n,
            None => default_jobs(),
        };

        if self.include_runtime && self.runtime.is_none() {
            return Err(missing_runtime_error());
        }

        Ok(TransformOptions {
            filter,
            basedir: self.basedir,
            compiler_overrides: self.overrides,
            include_runtime: self.include_runtime,
            runtime: self.runtime,
            source_root: self.source_root,
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SOURCE_MAPS_KEY;

    #[test]
    fn defaults_require_a_runtime() {
        let err = TransformOptions::builder().build().unwrap_err();
        assert!(matches!(err, CachifyError::ConfigError(msg) if msg.contains("include_runtime")));
    }

    #[test]
    fn runtime_can_be_disabled() {
        let opts = TransformOptions::builder()
            .include_runtime(false)
            .build()
            .unwrap();
        assert!(!opts.include_runtime);
        assert!(opts.jobs >= 1);
        assert!(opts.filter().matches(Path::new("a.js")));
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let err = TransformOptions::builder()
            .include_runtime(false)
            .jobs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, CachifyError::ConfigError(msg) if msg.contains("jobs")));
    }

    #[test]
    fn bad_pattern_fails_at_build_time() {
        let err = TransformOptions::builder()
            .include_runtime(false)
            .file_pattern("(")
            .build()
            .unwrap_err();
        assert!(matches!(err, CachifyError::ConfigError(_)));
    }

    #[test]
    fn bind_anchors_paths_and_excludes_runtime() {
        let opts = TransformOptions::builder()
            .runtime("support/runtime.js")
            .source_root("src")
            .build()
            .unwrap()
            .bind(Path::new("/proj"));

        assert_eq!(opts.basedir.as_deref(), Some(Path::new("/proj")));
        assert_eq!(opts.runtime.as_deref(), Some(Path::new("/proj/support/runtime.js")));
        assert_eq!(opts.source_root.as_deref(), Some(Path::new("/proj/src")));
        assert!(!opts.filter().matches(Path::new("/proj/support/runtime.js")));
        assert!(opts.filter().matches(Path::new("/proj/src/a.js")));
    }

    #[test]
    fn configured_basedir_wins_over_host() {
        let opts = TransformOptions::builder()
            .include_runtime(false)
            .basedir("/elsewhere")
            .build()
            .unwrap()
            .bind(Path::new("/proj"));
        assert_eq!(opts.basedir.as_deref(), Some(Path::new("/elsewhere")));
    }

    #[test]
    fn compiler_options_carry_overrides() {
        let opts = TransformOptions::builder()
            .include_runtime(false)
            .compiler_override(SOURCE_MAPS_KEY, serde_json::Value::Bool(false))
            .build()
            .unwrap();
        assert!(!opts.compiler_options().source_maps());
    }
}
