//! Reed-Solomon erasure coding over GF(2^8) with Azure-LRC+1 support
//!
//! An encoder turns `data_shards` equal-length byte buffers into
//! `parity_shards` additional buffers such that any `data_shards` of the
//! total suffice to recover the originals. Five matrix families are
//! available: the default systematic Vandermonde code, a Cauchy variant, a
//! PARv1-compatible matrix (kept bug-for-bug for interoperability), a
//! Jerasure-compatible matrix, and the Azure-LRC+1 locally recoverable
//! code, which adds per-AZ local parities so a single lost shard can be
//! repaired from its own availability zone.
//!
//! ```
//! use reed_solomon_lrc::ReedSolomon;
//!
//! let r = ReedSolomon::new(5, 3).unwrap();
//! let mut shards = r.split(b"some bytes worth keeping").unwrap();
//! r.encode(&mut shards).unwrap();
//!
//! // Any three shards may go missing.
//! shards[0] = Vec::new();
//! shards[2] = Vec::new();
//! shards[7] = Vec::new();
//! r.reconstruct(&mut shards).unwrap();
//!
//! let mut restored = Vec::new();
//! r.join(&mut restored, &shards, 24).unwrap();
//! assert_eq!(&restored, b"some bytes worth keeping");
//! ```
//!
//! The encoder is immutable after construction except for an internal
//! cache of inverted decode matrices, which is safe for concurrent use;
//! share one encoder across threads freely. Shard buffers always belong to
//! the caller. Missing shards are marked by zero-length buffers, and
//! reconstruction reuses a zero-length buffer's spare capacity when it is
//! large enough.

mod codematrix;
mod encoder;
pub mod errors;
pub mod galois;
mod inversion_tree;
pub mod matrix;
pub mod options;
mod reconstruct;
mod shards;

pub use encoder::ReedSolomon;
pub use errors::{Error, Result};
pub use options::Options;
