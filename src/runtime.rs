// src/runtime.rs

//! Runtime-support module injection.
//!
//! Compiled output depends on a small support module shipped with the
//! compiler. When `include_runtime` is on, that module is added to the
//! bundle once, whether or not any compiled file needs it. The filter built
//! by `TransformOptions::bind` already keeps it from being recompiled.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::TransformOptions;
use crate::plugin::BundleHost;

/// Resolved location of the runtime-support module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeModule {
    path: PathBuf,
}

impl RuntimeModule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured runtime module, if any. Absolute when `options` is
    /// bound.
    pub fn from_options(options: &TransformOptions) -> Option<Self> {
        options.runtime.as_ref().map(|p| Self::new(p.clone()))
    }

    /// Path for callers that include the module by hand.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Add the runtime module to `host` if `options` ask for it.
///
/// Returns the module when it is part of the bundle after the call. Adding
/// is idempotent: a host that already lists the module keeps one copy.
pub fn inject_runtime(host: &mut dyn BundleHost, options: &TransformOptions) -> Option<RuntimeModule> {
    if !options.include_runtime {
        debug!("runtime injection disabled");
        return None;
    }

    let runtime = RuntimeModule::from_options(options)?;
    if host.add_module(runtime.path().to_path_buf()) {
        info!(runtime = %runtime.path().display(), "added runtime module to bundle");
    } else {
        debug!(runtime = %runtime.path().display(), "runtime module already in bundle");
    }
    Some(runtime)
}
