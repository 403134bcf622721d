// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::RawConfigFile;
use crate::config::ConfigFile;
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and validate it.
///
/// This is the recommended entry point: it reads TOML, applies defaults
/// (handled by `serde` + `Default` impls) and rejects invalid values such as
/// a malformed `file_pattern`, before any file is transformed.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}
