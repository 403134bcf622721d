// src/watch/mod.rs

//! Watch mode: rebuild modules when their files change.
//!
//! Bundlers re-run transforms on every save; this module plays that role for
//! the `cachify` binary. It does not know about hashing or caching; those
//! live behind the engines it calls.

pub mod watcher;

pub use watcher::{spawn_watcher, WatcherHandle};
