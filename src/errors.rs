// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::compiler::CompileFailure;

#[derive(Error, Debug)]
pub enum CachifyError {
    /// Invalid plugin options. Raised while building `TransformOptions`,
    /// before any file is processed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The external compiler rejected a file. The diagnostic is kept as-is.
    #[error(transparent)]
    Compile(#[from] CompileFailure),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CachifyError {
    pub fn config(msg: impl Into<String>) -> Self {
        CachifyError::ConfigError(msg.into())
    }

    /// True when this error came from the compiler rather than the host.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, CachifyError::Compile(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CachifyError>;
