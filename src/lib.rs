// src/lib.rs

pub mod bundle;
pub mod cache;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod paths;
pub mod plugin;
pub mod runtime;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::bundle::{Bundler, ModuleSet};
use crate::cache::CompilationCache;
use crate::cli::CliArgs;
use crate::compiler::CommandCompiler;
use crate::config::loader::load_and_validate;
use crate::config::{ConfigFile, TransformOptions};
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::absolutize;
use crate::plugin::BundleHost;

pub use crate::cache::{CacheEntry, CacheStatus};
pub use crate::compiler::{CompileFailure, CompiledSource, Compiler, CompilerOptions};
pub use crate::engine::{StreamState, TransformEngine, TransformStream};
pub use crate::errors::{CachifyError, Result as CachifyResult};
pub use crate::plugin::{compile_file, register};
pub use crate::runtime::RuntimeModule;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - plugin registration on an in-process module set
/// - the external compiler
/// - one build into `--out`
/// - (optional) file watching until Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let cwd = std::env::current_dir()?;
    let root = absolutize(&cwd, &config_root_dir(&config_path));
    let out_dir = absolutize(&cwd, &args.out);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    // Bind up front so the module set lives at the configured basedir.
    // Binding is idempotent, so `register` re-binding is a no-op.
    let bound = cfg.transform.bind(&root);
    let mut set = ModuleSet::new(bound.basedir.clone().unwrap_or(root));

    if args.dry_run {
        runtime::inject_runtime(&mut set, &bound);
        add_modules(&mut set, fs.as_ref(), &args.files, &cwd, &out_dir)?;
        print_dry_run(&cfg, &bound, &set);
        return Ok(());
    }

    let cmd = cfg
        .compiler_cmd
        .clone()
        .ok_or_else(|| anyhow!("no [compiler].cmd configured in {}", config_path.display()))?;

    let compiler = Arc::new(CommandCompiler::new(cmd));
    let cache = Arc::new(CompilationCache::new());

    plugin::register(&mut set, &bound, compiler, cache)?;
    add_modules(&mut set, fs.as_ref(), &args.files, &cwd, &out_dir)?;

    let bundler = Bundler::new(Arc::clone(&fs), out_dir);
    let report = bundler.build(&set).await?;

    for (module, msg) in report.failures() {
        eprintln!("{}: {}", module.display(), msg);
    }

    if !args.watch {
        if report.has_failures() {
            bail!("{} module(s) failed to compile", report.failures().count());
        }
        return Ok(());
    }

    let _watcher = watch::spawn_watcher(set, bundler)?;
    info!("watching for changes; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}

/// Directory containing the config file, or `.` for a bare file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Add explicit `files`, or everything under the basedir when none are given.
fn add_modules(
    set: &mut ModuleSet,
    fs: &dyn FileSystem,
    files: &[PathBuf],
    cwd: &Path,
    out_dir: &Path,
) -> Result<()> {
    if files.is_empty() {
        let added = set.discover(fs, Some(out_dir))?;
        debug!(added, "discovered modules");
    } else {
        for file in files {
            set.add_module(absolutize(cwd, file));
        }
    }
    Ok(())
}

/// Simple dry-run output: effective options and which modules would compile.
fn print_dry_run(cfg: &ConfigFile, bound: &TransformOptions, set: &ModuleSet) {
    println!("cachify dry-run");
    println!("  file_pattern = {}", bound.filter().pattern());
    if let Some(basedir) = &bound.basedir {
        println!("  basedir = {}", basedir.display());
    }
    println!("  include_runtime = {}", bound.include_runtime);
    if let Some(runtime) = &bound.runtime {
        println!("  runtime = {}", runtime.display());
    }
    println!("  jobs = {}", bound.jobs);
    if let Some(cmd) = &cfg.compiler_cmd {
        println!("  compiler = {cmd}");
    }
    for (key, value) in bound.compiler_overrides.iter() {
        println!("  override {key} = {value}");
    }
    println!();

    println!("modules ({}):", set.len());
    for module in set.modules() {
        let action = if bound.filter().matches(module) {
            "compile"
        } else {
            "pass"
        };
        println!("  [{action}] {}", module.display());
    }
}
