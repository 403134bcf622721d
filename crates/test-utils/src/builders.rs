#![allow(dead_code)]

use std::path::PathBuf;

use cachify::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from `RawConfigFile::default()`, which has `include_runtime` on
/// and no runtime path; call `without_runtime` or `runtime` before `build`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn file_pattern(mut self, pattern: &str) -> Self {
        self.config.transform.file_pattern = pattern.to_string();
        self
    }

    pub fn exclude(mut self, glob: &str) -> Self {
        self.config.transform.exclude.push(glob.to_string());
        self
    }

    pub fn basedir(mut self, dir: &str) -> Self {
        self.config.transform.basedir = Some(PathBuf::from(dir));
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.transform.jobs = Some(jobs);
        self
    }

    pub fn without_runtime(mut self) -> Self {
        self.config.transform.include_runtime = false;
        self
    }

    pub fn runtime(mut self, path: &str) -> Self {
        self.config.compiler.runtime = Some(PathBuf::from(path));
        self
    }

    pub fn compiler_cmd(mut self, cmd: &str) -> Self {
        self.config.compiler.cmd = Some(cmd.to_string());
        self
    }

    pub fn source_root(mut self, dir: &str) -> Self {
        self.config.compiler.source_root = Some(PathBuf::from(dir));
        self
    }

    pub fn compiler_override(mut self, key: &str, value: serde_json::Value) -> Self {
        self.config.compiler.overrides.insert(key.to_string(), value);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
