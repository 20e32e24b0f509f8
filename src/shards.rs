//! Shard shape checks and the split/join utilities

use std::io;

use crate::encoder::ReedSolomon;
use crate::errors::{Error, Result};

/// The size of a single shard: the first non-zero length found, or 0 if
/// every shard is empty
pub(crate) fn shard_size(shards: &[Vec<u8>]) -> usize {
    shards
        .iter()
        .map(Vec::len)
        .find(|&len| len != 0)
        .unwrap_or(0)
}

/// Check that all shards share one size. With `allow_empty`, zero-length
/// shards pass (they mark missing data). Fails with [`Error::ShardNoData`]
/// when every shard is empty.
pub(crate) fn check_shards(shards: &[Vec<u8>], allow_empty: bool) -> Result<()> {
    let size = shard_size(shards);
    if size == 0 {
        return Err(Error::ShardNoData);
    }
    for shard in shards {
        if shard.len() != size && (!shard.is_empty() || !allow_empty) {
            return Err(Error::ShardSize);
        }
    }
    Ok(())
}

impl ReedSolomon {
    /// Split a data slice into shards, adding empty parity shards
    ///
    /// Each shard holds `ceil(len / data_shards)` bytes; the tail of the
    /// last data shard is zero-padded. The data is copied, so the input
    /// can be dropped afterwards. An empty input fails with
    /// [`Error::ShortData`].
    pub fn split(&self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        if data.is_empty() {
            return Err(Error::ShortData);
        }
        let per_shard = data.len().div_ceil(self.data_shards);

        let mut shards = Vec::with_capacity(self.total_shards);
        for i in 0..self.data_shards {
            let start = (i * per_shard).min(data.len());
            let end = (start + per_shard).min(data.len());
            let mut shard = Vec::with_capacity(per_shard);
            shard.extend_from_slice(&data[start..end]);
            shard.resize(per_shard, 0);
            shards.push(shard);
        }
        for _ in 0..self.parity_shards {
            shards.push(vec![0u8; per_shard]);
        }
        Ok(shards)
    }

    /// Concatenate the data shards into `dst`, writing exactly `out_size`
    /// bytes
    ///
    /// Fails with [`Error::ReconstructRequired`] if a needed data shard is
    /// missing and with [`Error::ShortData`] if the data shards hold fewer
    /// than `out_size` bytes.
    pub fn join<W: io::Write>(&self, dst: &mut W, shards: &[Vec<u8>], out_size: usize) -> Result<()> {
        if shards.len() < self.data_shards {
            return Err(Error::TooFewShards);
        }
        let shards = &shards[..self.data_shards];

        let mut available = 0;
        for shard in shards {
            if shard.is_empty() {
                return Err(Error::ReconstructRequired);
            }
            available += shard.len();
            if available >= out_size {
                break;
            }
        }
        if available < out_size {
            return Err(Error::ShortData);
        }

        let mut remaining = out_size;
        for shard in shards {
            if remaining < shard.len() {
                dst.write_all(&shard[..remaining])?;
                return Ok(());
            }
            dst.write_all(shard)?;
            remaining -= shard.len();
            if remaining == 0 {
                break;
            }
        }
        Ok(())
    }
}
