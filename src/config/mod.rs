// src/config/mod.rs

//! Configuration for cachify.
//!
//! - `model.rs`: the TOML-backed raw data model.
//! - `options.rs`: the validated [`TransformOptions`] snapshot and its builder.
//! - `loader.rs`: load a config file from disk.
//! - `validate.rs`: turn a raw config into a [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod options;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{CompilerSection, RawConfigFile, TransformSection};
pub use options::{default_jobs, TransformOptions, TransformOptionsBuilder};

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub transform: TransformOptions,
    /// External compiler command, if configured.
    pub compiler_cmd: Option<String>,
}
