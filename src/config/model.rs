// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::filter::DEFAULT_FILE_PATTERN;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [transform]
/// file_pattern = "\\.js$"
/// exclude = ["vendor/**"]
/// basedir = "src"
/// include_runtime = true
/// jobs = 4
///
/// [compiler]
/// cmd = "my-compiler --stdin"
/// runtime = "support/runtime.js"
/// source_root = "src"
///
/// [compiler.overrides]
/// source_maps = false
/// ```
///
/// All sections are optional and have reasonable defaults. Use
/// `ConfigFile::try_from` (or `loader::load_and_validate`) to get the
/// validated form.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub transform: TransformSection,

    #[serde(default)]
    pub compiler: CompilerSection,
}

/// `[transform]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformSection {
    /// Regex selecting files to compile. Default: `\.js$`.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Globs (relative to `basedir`) that are never compiled.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Base directory for relative module paths. Default: the host's basedir
    /// (for the CLI, the directory holding the config file).
    #[serde(default)]
    pub basedir: Option<PathBuf>,

    /// Add the runtime-support module to the bundle. Default: `true`.
    #[serde(default = "default_include_runtime")]
    pub include_runtime: bool,

    /// Maximum compiles in flight. Default: available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,
}

fn default_file_pattern() -> String {
    DEFAULT_FILE_PATTERN.to_string()
}

fn default_include_runtime() -> bool {
    true
}

impl Default for TransformSection {
    fn default() -> Self {
        Self {
            file_pattern: default_file_pattern(),
            exclude: Vec::new(),
            basedir: None,
            include_runtime: default_include_runtime(),
            jobs: None,
        }
    }
}

/// `[compiler]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompilerSection {
    /// External compiler command, run through the platform shell.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Runtime-support module shipped with the compiler (relative to
    /// `basedir` unless absolute).
    #[serde(default)]
    pub runtime: Option<PathBuf>,

    /// Root for relative paths in generated source maps.
    #[serde(default)]
    pub source_root: Option<PathBuf>,

    /// Passed verbatim to the compiler.
    #[serde(default)]
    pub overrides: BTreeMap<String, serde_json::Value>,
}
