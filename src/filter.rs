// src/filter.rs

//! Decide which files go through the compiler.
//!
//! A file participates when its path matches the configured regex, is not
//! covered by one of the optional exclude globs, and is not the
//! runtime-support module. The runtime module is already in the target
//! format, so it is excluded no matter what the pattern says.

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::errors::{CachifyError, Result};
use crate::paths::{relative_str, slash_str};

/// Pattern used when the configuration does not name one.
pub const DEFAULT_FILE_PATTERN: &str = r"\.js$";

#[derive(Clone)]
pub struct PatternFilter {
    pattern: Regex,
    /// Exclude globs are evaluated against paths relative to this root.
    root: Option<PathBuf>,
    exclude_set: Option<GlobSet>,
    runtime: Option<PathBuf>,
}

impl fmt::Debug for PatternFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternFilter")
            .field("pattern", &self.pattern.as_str())
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self::new(default_pattern())
    }
}

impl PatternFilter {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            root: None,
            exclude_set: None,
            runtime: None,
        }
    }

    /// Compile `pattern` as a regex. An invalid pattern is a configuration
    /// error, so a bad config never silently passes all or no files.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        Ok(Self::new(compile_pattern(pattern)?))
    }

    /// Never transform files matching any of `globs`.
    pub fn with_excludes(mut self, globs: &[String]) -> Result<Self> {
        self.exclude_set = if globs.is_empty() {
            None
        } else {
            Some(build_globset(globs)?)
        };
        Ok(self)
    }

    /// Evaluate exclude globs relative to `root`. Paths outside `root` are
    /// matched as given.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Exclude the runtime-support module regardless of the pattern.
    pub fn excluding_runtime(mut self, runtime: impl Into<PathBuf>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn runtime(&self) -> Option<&Path> {
        self.runtime.as_deref()
    }

    /// Returns true if `path` should be compiled.
    pub fn matches(&self, path: &Path) -> bool {
        if self.runtime.as_deref() == Some(path) {
            return false;
        }
        if !self.pattern.is_match(&path.to_string_lossy()) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            let candidate = self
                .root
                .as_deref()
                .and_then(|root| relative_str(root, path))
                .unwrap_or_else(|| slash_str(path));
            if exclude.is_match(&candidate) {
                return false;
            }
        }
        true
    }
}

pub fn default_pattern() -> Regex {
    Regex::new(DEFAULT_FILE_PATTERN).expect("default file pattern is a valid regex")
}

pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        CachifyError::config(format!("`file_pattern` must be a valid regex: {e}"))
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .map_err(|e| CachifyError::config(format!("invalid exclude glob {pat:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CachifyError::config(format!("building exclude globset: {e}")))
}
