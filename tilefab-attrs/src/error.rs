//! Error types for tilefab-attrs

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Attribute-core error type
///
/// All variants are fatal to the ingest of the current run: the interning
/// tables grow monotonically and there is no local recovery once an index
/// space is exhausted.
#[derive(Error, Debug)]
pub enum Error {
    /// The key dictionary ran out of 16-bit indices
    #[error("more than 65,534 unique attribute keys (last key: {0:?})")]
    TooManyKeys(String),

    /// A cold pair shard exceeded its addressable capacity
    #[error("pair shard {shard} exceeded its capacity of {capacity} entries")]
    ShardOverflow { shard: u32, capacity: u32 },
}

impl Error {
    /// Create a key-exhaustion error
    pub fn too_many_keys(key: impl Into<String>) -> Self {
        Error::TooManyKeys(key.into())
    }

    /// Create a shard-overflow error
    pub fn shard_overflow(shard: u32, capacity: u32) -> Self {
        Error::ShardOverflow { shard, capacity }
    }
}
