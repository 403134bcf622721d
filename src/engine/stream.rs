// src/engine/stream.rs

//! Per-file duplex stream handed out by [`TransformEngine`].
//!
//! The writable half ([`TransformSink`]) accepts raw chunks; dropping it or
//! calling `end` signals end-of-input. The readable half
//! ([`TransformSource`]) yields either the original chunks (pass-through),
//! the complete compiled output, or a single error. End-of-output is the
//! channel closing.
//!
//! [`TransformEngine`]: super::TransformEngine

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, watch};

use crate::errors::{CachifyError, Result};

/// Lifecycle of one file's stream.
///
/// `Open -> Buffering -> (Compiling | Cached) -> (Emitted | Failed)` for
/// matching files, `Open -> PassThrough -> Emitted` for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    PassThrough,
    Buffering,
    Compiling,
    Cached,
    Emitted { from_cache: bool },
    Failed,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Emitted { .. } | StreamState::Failed)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamState::Open => "open",
            StreamState::PassThrough => "pass-through",
            StreamState::Buffering => "buffering",
            StreamState::Compiling => "compiling",
            StreamState::Cached => "cached",
            StreamState::Emitted { .. } => "emitted",
            StreamState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Items on the readable side.
pub type StreamItem = Result<Bytes>;

/// Writable half.
#[derive(Debug)]
pub struct TransformSink {
    file: PathBuf,
    input: mpsc::Sender<Bytes>,
}

impl TransformSink {
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Feed one chunk. Fails if the stream's worker has already gone away.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<()> {
        self.input.send(chunk.into()).await.map_err(|_| {
            CachifyError::Other(anyhow!(
                "transform stream for {} is closed",
                self.file.display()
            ))
        })
    }

    /// Signal end-of-input.
    pub fn end(self) {}
}

/// Readable half.
#[derive(Debug)]
pub struct TransformSource {
    file: PathBuf,
    output: mpsc::UnboundedReceiver<StreamItem>,
    state: watch::Receiver<StreamState>,
}

impl TransformSource {
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Next chunk, an error, or `None` once output has ended.
    pub async fn next(&mut self) -> Option<StreamItem> {
        self.output.recv().await
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Read until end-of-output and concatenate everything.
    ///
    /// An error item is definitive: it is returned and nothing read before
    /// it is kept.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(item) = self.next().await {
            buf.extend_from_slice(&item?);
        }
        Ok(buf.freeze())
    }

    pub async fn collect(mut self) -> Result<Bytes> {
        self.read_to_end().await
    }
}

/// Both halves of one file's transform.
#[derive(Debug)]
pub struct TransformStream {
    sink: Option<TransformSink>,
    source: TransformSource,
}

impl TransformStream {
    pub(crate) fn new(
        file: PathBuf,
        input: mpsc::Sender<Bytes>,
        output: mpsc::UnboundedReceiver<StreamItem>,
        state: watch::Receiver<StreamState>,
    ) -> Self {
        Self {
            sink: Some(TransformSink {
                file: file.clone(),
                input,
            }),
            source: TransformSource {
                file,
                output,
                state,
            },
        }
    }

    pub fn file(&self) -> &Path {
        self.source.file()
    }

    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<()> {
        match &self.sink {
            Some(sink) => sink.write(chunk).await,
            None => Err(CachifyError::Other(anyhow!(
                "write after end on transform stream for {}",
                self.file().display()
            ))),
        }
    }

    /// Signal end-of-input. Further writes fail.
    pub fn end(&mut self) {
        self.sink.take();
    }

    pub async fn next(&mut self) -> Option<StreamItem> {
        self.source.next().await
    }

    pub fn state(&self) -> StreamState {
        self.source.state()
    }

    /// End input (if still open) and read the whole output.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        self.end();
        self.source.read_to_end().await
    }

    pub async fn collect(mut self) -> Result<Bytes> {
        self.read_to_end().await
    }

    /// Split into halves so writing and reading can happen concurrently.
    /// The sink is `None` if input was already ended.
    pub fn split(self) -> (Option<TransformSink>, TransformSource) {
        (self.sink, self.source)
    }
}
