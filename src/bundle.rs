// src/bundle.rs

//! Minimal bundle host used by the `cachify` binary.
//!
//! [`ModuleSet`] implements [`BundleHost`]: it holds the module list and the
//! registered transforms. [`Bundler`] reads each module, pipes it through
//! every transform in registration order and writes the result under the
//! output directory, mirroring paths relative to the basedir.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::{StreamState, TransformEngine};
use crate::fs::{collect_files, FileSystem};
use crate::paths::relative_str;
use crate::plugin::BundleHost;

/// Chunk size used when feeding file contents into a transform stream.
const CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone)]
pub struct ModuleSet {
    basedir: PathBuf,
    modules: BTreeSet<PathBuf>,
    transforms: Vec<TransformEngine>,
}

impl ModuleSet {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            modules: BTreeSet::new(),
            transforms: Vec::new(),
        }
    }

    pub fn modules(&self) -> impl Iterator<Item = &Path> {
        self.modules.iter().map(PathBuf::as_path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn transforms(&self) -> &[TransformEngine] {
        &self.transforms
    }

    /// Add every file under the basedir, except those below `skip`.
    pub fn discover(&mut self, fs: &dyn FileSystem, skip: Option<&Path>) -> Result<usize> {
        let files = collect_files(fs, &self.basedir, skip)?;
        let before = self.modules.len();
        for file in files {
            self.modules.insert(file);
        }
        Ok(self.modules.len() - before)
    }
}

impl BundleHost for ModuleSet {
    fn basedir(&self) -> &Path {
        &self.basedir
    }

    fn add_module(&mut self, path: PathBuf) -> bool {
        self.modules.insert(path)
    }

    fn add_transform(&mut self, engine: TransformEngine) {
        self.transforms.push(engine);
    }
}

/// How one module went through the transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    Compiled,
    Cached,
    PassedThrough,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub modules: Vec<(PathBuf, ModuleOutcome)>,
}

impl BuildReport {
    fn count(&self, pred: impl Fn(&ModuleOutcome) -> bool) -> usize {
        self.modules.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn compiled(&self) -> usize {
        self.count(|o| *o == ModuleOutcome::Compiled)
    }

    pub fn cached(&self) -> usize {
        self.count(|o| *o == ModuleOutcome::Cached)
    }

    pub fn passed_through(&self) -> usize {
        self.count(|o| *o == ModuleOutcome::PassedThrough)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.modules.iter().filter_map(|(p, o)| match o {
            ModuleOutcome::Failed(msg) => Some((p.as_path(), msg.as_str())),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Writes transformed modules to an output directory.
#[derive(Debug, Clone)]
pub struct Bundler {
    fs: Arc<dyn FileSystem>,
    out_dir: PathBuf,
}

impl Bundler {
    pub fn new(fs: Arc<dyn FileSystem>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Output location for `module`.
    pub fn output_path(&self, basedir: &Path, module: &Path) -> PathBuf {
        match relative_str(basedir, module) {
            Some(rel) => self.out_dir.join(rel),
            None => self
                .out_dir
                .join(module.file_name().unwrap_or(module.as_os_str())),
        }
    }

    /// Transform and write every module in `set`.
    ///
    /// Modules run concurrently; compile concurrency is bounded by each
    /// engine's pool. A failing module is reported, not fatal.
    pub async fn build(&self, set: &ModuleSet) -> Result<BuildReport> {
        let mut join = JoinSet::new();
        for module in set.modules() {
            let bundler = self.clone();
            let transforms = set.transforms().to_vec();
            let basedir = set.basedir().to_path_buf();
            let module = module.to_path_buf();
            join.spawn(async move {
                let outcome = bundler.build_module(&basedir, &transforms, &module).await;
                (module, outcome)
            });
        }

        let mut report = BuildReport::default();
        while let Some(res) = join.join_next().await {
            let (module, outcome) = res.context("module build task panicked")?;
            let outcome = outcome?;
            report.modules.push((module, outcome));
        }
        report.modules.sort_by(|a, b| a.0.cmp(&b.0));

        info!(
            modules = report.modules.len(),
            compiled = report.compiled(),
            cached = report.cached(),
            passed_through = report.passed_through(),
            failed = report.failures().count(),
            "build finished"
        );
        Ok(report)
    }

    /// Transform and write a single module.
    ///
    /// Host-side problems (unreadable input, unwritable output) are errors;
    /// compile failures are an outcome.
    pub async fn build_module(
        &self,
        basedir: &Path,
        transforms: &[TransformEngine],
        module: &Path,
    ) -> Result<ModuleOutcome> {
        let mut data = self.fs.read(module)?;
        let mut outcome = ModuleOutcome::PassedThrough;

        for engine in transforms {
            let mut stream = engine.create_transform(module);
            for chunk in data.chunks(CHUNK_SIZE) {
                stream.write(chunk.to_vec()).await?;
            }
            match stream.read_to_end().await {
                Ok(bytes) => data = bytes.to_vec(),
                Err(err) if err.is_compile_error() => {
                    warn!(module = %module.display(), error = %err, "module failed to compile");
                    return Ok(ModuleOutcome::Failed(err.to_string()));
                }
                Err(err) => return Err(err.into()),
            }
            match stream.state() {
                StreamState::Emitted { from_cache: true } => outcome = ModuleOutcome::Cached,
                StreamState::Emitted { from_cache: false } if engine.matches(module) => {
                    outcome = ModuleOutcome::Compiled
                }
                _ => {}
            }
        }

        let out = self.output_path(basedir, module);
        self.fs.write(&out, &data)?;
        debug!(module = %module.display(), out = %out.display(), ?outcome, "wrote module");
        Ok(outcome)
    }
}
