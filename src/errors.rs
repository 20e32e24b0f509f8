//! Error types for encoding, reconstruction and shard handling.

use thiserror::Error;

/// Errors that can occur during erasure coding operations
#[derive(Debug, Error)]
pub enum Error {
    /// Encoder constructed with zero data or parity shards
    #[error("cannot create encoder with zero data or parity shards")]
    InvalidShardNum,

    /// Encoder constructed with more shards than GF(2^8) supports
    #[error("cannot create encoder with more than 256 data+parity shards")]
    MaxShardNum,

    /// Wrong shard count, or not enough survivors to reconstruct
    #[error("too few shards given")]
    TooFewShards,

    /// All shards are empty
    #[error("no shard data")]
    ShardNoData,

    /// Present shards have differing lengths
    #[error("shard sizes do not match")]
    ShardSize,

    /// Update called with inconsistent old/new shard presence
    #[error("invalid input")]
    InvalidInput,

    /// Split or join given fewer bytes than required
    #[error("not enough data to fill the number of requested shards")]
    ShortData,

    /// Join encountered a missing data shard
    #[error("reconstruction required as one or more required data shards are missing")]
    ReconstructRequired,

    /// Partial reconstruction received a present shard outside the survivor set
    #[error("present shards are not in the survival index set")]
    ShardsNotSurvival,

    /// Partial reconstruction index lists must be strictly increasing
    #[error("bad/survival index lists are not strictly increasing")]
    IndexNotIncremental,

    /// A decode submatrix could not be inverted
    #[error("matrix is singular")]
    SingularMatrix,

    /// Matrix operands have incompatible dimensions
    #[error("matrix sizes do not match")]
    MatrixSize,

    /// I/O error while joining shards into a writer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with the crate error type
pub type Result<T> = std::result::Result<T, Error>;
