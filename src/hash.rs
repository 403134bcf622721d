// src/hash.rs

//! Content hashing used to decide whether a cached compile is still valid.
//!
//! Files are hashed whole: the transform stream accumulates every chunk and
//! only then asks for a digest. The digest is BLAKE3, rendered as lowercase
//! hex, so two buffers share a hash only if their bytes are identical.

use std::fmt;

use blake3::Hasher;

/// Hex-encoded BLAKE3 digest of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the content hash of a byte buffer.
pub fn content_hash(data: &[u8]) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    ContentHash(hasher.finalize().to_hex().to_string())
}

/// Compute the content hash of content delivered as separate chunks.
///
/// Equivalent to hashing the concatenation of `chunks`.
pub fn content_hash_chunks<I, B>(chunks: I) -> ContentHash
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut hasher = Hasher::new();
    for chunk in chunks {
        hasher.update(chunk.as_ref());
    }
    ContentHash(hasher.finalize().to_hex().to_string())
}
