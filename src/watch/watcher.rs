// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::bundle::{Bundler, ModuleOutcome, ModuleSet};
use crate::paths::relative_str;
use crate::plugin::BundleHost;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the module set's basedir and rebuild modules as they change.
///
/// Each changed file goes back through the same engines, so content that
/// did not actually change is served from the compilation cache. Files
/// below the bundler's output directory are ignored.
pub fn spawn_watcher(set: ModuleSet, bundler: Bundler) -> Result<WatcherHandle> {
    let basedir = set.basedir().to_path_buf();
    // Canonicalize once so event paths can be related back to the basedir.
    let root = basedir.canonicalize().unwrap_or_else(|_| basedir.clone());
    let out_dir = bundler
        .out_dir()
        .canonicalize()
        .unwrap_or_else(|_| bundler.out_dir().to_path_buf());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("cachify: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("cachify: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let set = Arc::new(set);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                continue;
            }
            for path in event.paths {
                if path.starts_with(&out_dir) || !path.is_file() {
                    continue;
                }
                // Use the same identity as the initial build so the cache
                // recognises the file.
                let module = match relative_str(&root, &path) {
                    Some(rel) => set.basedir().join(rel),
                    None => path,
                };
                rebuild_module(&set, &bundler, module).await;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

async fn rebuild_module(set: &ModuleSet, bundler: &Bundler, path: PathBuf) {
    match bundler
        .build_module(set.basedir(), set.transforms(), &path)
        .await
    {
        Ok(ModuleOutcome::Failed(msg)) => {
            warn!(module = %path.display(), "rebuild failed: {msg}");
        }
        Ok(outcome) => {
            info!(module = %path.display(), ?outcome, "rebuilt module");
        }
        Err(err) => {
            warn!(module = %path.display(), error = %err, "could not rebuild module");
        }
    }
}
