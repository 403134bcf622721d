// src/compiler/command.rs

//! Compiler backed by an external command.
//!
//! The command runs through the platform shell with the source on stdin.
//! Per-call options travel as environment variables:
//!
//! | variable              | value                                     |
//! |-----------------------|-------------------------------------------|
//! | `CACHIFY_FILE`        | file identity (absolute path)             |
//! | `CACHIFY_SOURCE_ROOT` | root for source-map relative paths        |
//! | `CACHIFY_SOURCES`     | path of the file relative to that root    |
//! | `CACHIFY_SOURCE_MAPS` | `true` or `false`                         |
//! | `CACHIFY_OPTIONS`     | compiler overrides as a JSON object       |
//!
//! Exit status 0 means stdout is the compiled output. Any other status is a
//! [`CompileFailure`] carrying stderr (or stdout when stderr is empty).

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{CompileFailure, CompileFuture, CompileRequest, CompiledSource, Compiler};
use crate::paths::slash_str;

#[derive(Debug, Clone)]
pub struct CommandCompiler {
    cmd: String,
}

impl CommandCompiler {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, request: CompileRequest) -> CompileFuture {
        let cmd = self.cmd.clone();
        Box::pin(async move {
            let file = request.file.clone();
            match run_compiler(&cmd, request).await {
                Ok(result) => result,
                // Failing to even run the compiler is still a failure of this
                // file's attempt; keep the full context chain in the message.
                Err(err) => Err(CompileFailure::new(format!(
                    "{}: {:#}",
                    file.display(),
                    err
                ))),
            }
        })
    }
}

async fn run_compiler(
    cmd: &str,
    request: CompileRequest,
) -> Result<std::result::Result<CompiledSource, CompileFailure>> {
    let CompileRequest {
        file,
        source,
        options,
    } = request;

    let overrides = serde_json::to_string(&options.overrides)
        .context("encoding compiler overrides as JSON")?;

    info!(file = %file.display(), cmd = %cmd, "starting compiler process");

    let mut command = shell_command(cmd);
    command
        .env("CACHIFY_FILE", &file)
        .env("CACHIFY_SOURCE_ROOT", slash_str(&options.source_root_for(&file)))
        .env("CACHIFY_SOURCES", options.relative_source(&file))
        .env("CACHIFY_SOURCE_MAPS", options.source_maps().to_string())
        .env("CACHIFY_OPTIONS", overrides)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning compiler `{cmd}`"))?;

    // Feed stdin from its own task so a compiler that writes before it has
    // read everything cannot deadlock against us.
    let writer = child.stdin.take().map(|mut stdin| {
        tokio::spawn(async move {
            let res = stdin.write_all(source.as_bytes()).await;
            // Dropping closes the pipe so the compiler sees end-of-input.
            drop(stdin);
            res
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for compiler `{cmd}`"))?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(file = %file.display(), error = %e, "compiler closed stdin early"),
            Err(e) => debug!(file = %file.display(), error = %e, "stdin writer task failed"),
        }
    }

    let code = output.status.code().unwrap_or(-1);
    debug!(
        file = %file.display(),
        exit_code = code,
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "compiler process exited"
    );

    if output.status.success() {
        let compiled = String::from_utf8(output.stdout)
            .context("compiler produced non UTF-8 output")?;
        return Ok(Ok(CompiledSource::new(compiled)));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    let message = if message.is_empty() {
        format!("compiler exited with status {code}")
    } else {
        message
    };

    Ok(Err(CompileFailure::new(message)))
}

/// Build a shell command appropriate for the platform.
fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}
