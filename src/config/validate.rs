// src/config/validate.rs

use crate::config::model::RawConfigFile;
use crate::config::options::TransformOptions;
use crate::config::ConfigFile;
use crate::errors::{CachifyError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CachifyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_compiler_cmd(&raw)?;
        let transform = transform_options(&raw)?;
        Ok(ConfigFile {
            transform,
            compiler_cmd: raw.compiler.cmd,
        })
    }
}

fn validate_compiler_cmd(cfg: &RawConfigFile) -> Result<()> {
    if let Some(cmd) = &cfg.compiler.cmd {
        if cmd.trim().is_empty() {
            return Err(CachifyError::config(
                "[compiler].cmd must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn transform_options(cfg: &RawConfigFile) -> Result<TransformOptions> {
    let t = &cfg.transform;
    let c = &cfg.compiler;

    let mut builder = TransformOptions::builder()
        .file_pattern(t.file_pattern.clone())
        .include_runtime(t.include_runtime)
        .compiler_overrides(c.overrides.clone());

    for glob in &t.exclude {
        builder = builder.exclude(glob.clone());
    }
    if let Some(dir) = &t.basedir {
        builder = builder.basedir(dir.clone());
    }
    if let Some(jobs) = t.jobs {
        builder = builder.jobs(jobs);
    }
    if let Some(runtime) = &c.runtime {
        builder = builder.runtime(runtime.clone());
    }
    if let Some(root) = &c.source_root {
        builder = builder.source_root(root.clone());
    }

    builder.build()
}
