//! The encoder type and the shard-coding kernel
//!
//! `ReedSolomon` is immutable after construction apart from the inversion
//! cache, so a single encoder can be shared across threads. Coding work is
//! expressed through one kernel: multiply a set of matrix rows by a set of
//! input shards into a set of output shards. Encode, verify, update and
//! reconstruction all reduce to it.
//!
//! When the shard size crosses the split threshold and more than one worker
//! is budgeted, the byte range is partitioned into contiguous chunks and
//! the kernel runs per chunk on the rayon pool. Chunks own disjoint
//! sub-slices of every output shard, so workers never synchronize.

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rayon::prelude::*;

use crate::codematrix;
use crate::errors::{Error, Result};
use crate::galois::{gal_mul_slice, gal_mul_slice_xor};
use crate::inversion_tree::InversionTree;
use crate::matrix::Matrix;
use crate::options::{MatrixKind, Options};
use crate::shards::{check_shards, shard_size};

/// Number of local parities in the Azure-LRC+1 construction. The matrix
/// derivation assumes one local parity per AZ and two data AZs; do not
/// change without re-deriving the construction.
const AZURE_LRC_LOCAL_PARITIES: usize = 3;

/// How the coder combines each product with the output buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// The first input column overwrites the output, later columns
    /// accumulate. Used when outputs start with arbitrary contents.
    Overwrite,
    /// Every column accumulates into the output. Used for partial
    /// decoding, where each call adds its contribution to the caller's
    /// running sum.
    Accumulate,
}

/// Reed-Solomon encoder for one distribution of data and parity shards
///
/// ```
/// use reed_solomon_lrc::ReedSolomon;
///
/// let r = ReedSolomon::new(4, 2).unwrap();
/// let mut shards = r.split(b"hello world").unwrap();
/// r.encode(&mut shards).unwrap();
/// assert!(r.verify(&shards).unwrap());
///
/// // Lose two shards, then bring them back.
/// shards[1] = Vec::new();
/// shards[4] = Vec::new();
/// r.reconstruct(&mut shards).unwrap();
/// assert!(r.verify(&shards).unwrap());
/// ```
pub struct ReedSolomon {
    pub(crate) data_shards: usize,
    pub(crate) parity_shards: usize,
    pub(crate) total_shards: usize,
    pub(crate) matrix: Matrix,
    /// Owned copies of the matrix rows `[data_shards..]`
    pub(crate) parity_rows: Vec<Vec<u8>>,
    pub(crate) tree: InversionTree,
    pub(crate) opts: Options,
}

impl ReedSolomon {
    /// Create an encoder with the default systematic Vandermonde matrix
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<ReedSolomon> {
        ReedSolomon::with_options(data_shards, parity_shards, Options::default())
    }

    /// Create an encoder with explicit options
    ///
    /// The matrix family is fixed here; the total shard count may not
    /// exceed 256, the order of GF(2^8). For Azure-LRC+1, `parity_shards`
    /// counts the global parities plus the three local parities, and
    /// `data_shards` must divide evenly across the two data AZs.
    pub fn with_options(
        data_shards: usize,
        parity_shards: usize,
        mut opts: Options,
    ) -> Result<ReedSolomon> {
        if data_shards == 0 || parity_shards == 0 {
            return Err(Error::InvalidShardNum);
        }
        let total_shards = data_shards + parity_shards;
        if total_shards > 256 {
            return Err(Error::MaxShardNum);
        }

        let matrix = match opts.matrix_kind {
            MatrixKind::Vandermonde => codematrix::vandermonde_systematic(data_shards, total_shards)?,
            MatrixKind::Cauchy => codematrix::cauchy(data_shards, total_shards)?,
            MatrixKind::Par1 => codematrix::par1(data_shards, total_shards)?,
            MatrixKind::Jerasure => codematrix::jerasure(data_shards, total_shards)?,
            MatrixKind::AzureLrcP1 => {
                let local = AZURE_LRC_LOCAL_PARITIES;
                if parity_shards <= local || data_shards % (local - 1) != 0 {
                    return Err(Error::InvalidShardNum);
                }
                codematrix::azure_lrc_p1(data_shards, parity_shards - local, local)?
            }
        };

        if opts.shard_size > 0 {
            opts.tune_workers(parity_shards);
        }
        if opts.use_avx512 || opts.use_sse2 {
            debug!(
                "SIMD hints accepted (avx512={}, sse2={}); scalar table kernels in use",
                opts.use_avx512, opts.use_sse2
            );
        }

        let parity_rows = (0..parity_shards)
            .map(|i| matrix.row(data_shards + i).to_vec())
            .collect();

        Ok(ReedSolomon {
            data_shards,
            parity_shards,
            total_shards,
            matrix,
            parity_rows,
            tree: InversionTree::new(data_shards, parity_shards),
            opts,
        })
    }

    pub fn data_shard_count(&self) -> usize {
        self.data_shards
    }

    pub fn parity_shard_count(&self) -> usize {
        self.parity_shards
    }

    pub fn total_shard_count(&self) -> usize {
        self.total_shards
    }

    /// Compute parity for a set of data shards
    ///
    /// `shards` holds data shards followed by parity shards; all must be
    /// present and the same length. The parity shards are overwritten, the
    /// data shards are only read.
    pub fn encode(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        if shards.len() != self.total_shards {
            return Err(Error::TooFewShards);
        }
        check_shards(shards, false)?;

        let byte_count = shards[0].len();
        let (data, parity) = shards.split_at_mut(self.data_shards);
        let inputs: Vec<&[u8]> = data.iter().map(Vec::as_slice).collect();
        let mut outputs: Vec<&mut [u8]> = parity.iter_mut().map(Vec::as_mut_slice).collect();
        let rows: Vec<&[u8]> = self.parity_rows.iter().map(Vec::as_slice).collect();

        self.code_some_shards(&rows, &inputs, &mut outputs, byte_count, WriteMode::Overwrite);
        Ok(())
    }

    /// Check that the parity shards are consistent with the data shards
    ///
    /// Recomputes every parity into scratch space and compares. Nothing is
    /// modified. Parallel verification short-circuits once any worker finds
    /// a mismatch.
    pub fn verify(&self, shards: &[Vec<u8>]) -> Result<bool> {
        if shards.len() != self.total_shards {
            return Err(Error::TooFewShards);
        }
        check_shards(shards, false)?;

        let byte_count = shards[0].len();
        let inputs: Vec<&[u8]> = shards[..self.data_shards].iter().map(Vec::as_slice).collect();
        let to_check: Vec<&[u8]> = shards[self.data_shards..].iter().map(Vec::as_slice).collect();
        let rows: Vec<&[u8]> = self.parity_rows.iter().map(Vec::as_slice).collect();

        Ok(self.check_some_shards(&rows, &inputs, &to_check, byte_count))
    }

    /// Re-compute parity after changing a few data shards
    ///
    /// `new_data` has one entry per data shard; an empty entry means the
    /// column is unchanged. Only the deltas flow through the matrix, so
    /// this is much cheaper than a full re-encode when few columns change.
    /// The old contents of every changed column and all parity shards must
    /// be present in `shards`; the parity shards are updated in place.
    pub fn update(&self, shards: &mut [Vec<u8>], new_data: &[Vec<u8>]) -> Result<()> {
        if shards.len() != self.total_shards {
            return Err(Error::TooFewShards);
        }
        if new_data.len() != self.data_shards {
            return Err(Error::TooFewShards);
        }
        check_shards(shards, true)?;
        check_shards(new_data, true)?;

        for (new, old) in new_data.iter().zip(shards.iter()) {
            if !new.is_empty() && old.is_empty() {
                return Err(Error::InvalidInput);
            }
        }
        for parity in &shards[self.data_shards..] {
            if parity.is_empty() {
                return Err(Error::InvalidInput);
            }
        }

        let byte_count = shard_size(shards);
        if shard_size(new_data) != byte_count {
            return Err(Error::ShardSize);
        }

        let (old_data, parity) = shards.split_at_mut(self.data_shards);
        let mut outputs: Vec<&mut [u8]> = parity.iter_mut().map(Vec::as_mut_slice).collect();
        let rows: Vec<&[u8]> = self.parity_rows.iter().map(Vec::as_slice).collect();

        self.update_parity_shards(&rows, old_data, new_data, &mut outputs, byte_count);
        Ok(())
    }

    /// Multiply a set of matrix rows by the input shards into the output
    /// shards. `matrix_rows`, `outputs` and the row count all agree; each
    /// row's column count matches `inputs`.
    pub(crate) fn code_some_shards(
        &self,
        matrix_rows: &[&[u8]],
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        byte_count: usize,
        mode: WriteMode,
    ) {
        if outputs.is_empty() {
            return;
        }
        if self.opts.max_workers > 1 && byte_count > self.opts.min_split_size {
            self.code_some_shards_split(matrix_rows, inputs, outputs, byte_count, mode);
            return;
        }
        code_chunk(matrix_rows, inputs, outputs, mode);
    }

    fn code_some_shards_split(
        &self,
        matrix_rows: &[&[u8]],
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        byte_count: usize,
        mode: WriteMode,
    ) {
        let tasks = split_outputs(outputs, &self.split_ranges(byte_count));
        tasks.into_par_iter().for_each(|(start, len, mut outs)| {
            let ins: Vec<&[u8]> = inputs.iter().map(|input| &input[start..start + len]).collect();
            code_chunk(matrix_rows, &ins, &mut outs, mode);
        });
    }

    fn check_some_shards(
        &self,
        matrix_rows: &[&[u8]],
        inputs: &[&[u8]],
        to_check: &[&[u8]],
        byte_count: usize,
    ) -> bool {
        if self.opts.max_workers > 1 && byte_count > self.opts.min_split_size {
            return self.check_some_shards_split(matrix_rows, inputs, to_check, byte_count);
        }

        let mut scratch: Vec<Vec<u8>> = to_check.iter().map(|_| vec![0u8; byte_count]).collect();
        {
            let mut views: Vec<&mut [u8]> = scratch.iter_mut().map(Vec::as_mut_slice).collect();
            code_chunk(matrix_rows, inputs, &mut views, WriteMode::Accumulate);
        }
        scratch
            .iter()
            .zip(to_check.iter())
            .all(|(calc, check)| calc.as_slice() == *check)
    }

    fn check_some_shards_split(
        &self,
        matrix_rows: &[&[u8]],
        inputs: &[&[u8]],
        to_check: &[&[u8]],
        byte_count: usize,
    ) -> bool {
        let still_matching = AtomicBool::new(true);

        self.split_ranges(byte_count)
            .into_par_iter()
            .for_each(|(start, len)| {
                let mut scratch: Vec<Vec<u8>> = to_check.iter().map(|_| vec![0u8; len]).collect();
                for (c, input) in inputs.iter().enumerate() {
                    // Another worker may already have found a mismatch;
                    // eventual visibility is all that is needed here.
                    if !still_matching.load(Ordering::Relaxed) {
                        return;
                    }
                    for (row, out) in matrix_rows.iter().zip(scratch.iter_mut()) {
                        gal_mul_slice_xor(row[c], &input[start..start + len], out);
                    }
                }
                for (calc, check) in scratch.iter().zip(to_check.iter()) {
                    if calc.as_slice() != &check[start..start + len] {
                        still_matching.store(false, Ordering::Relaxed);
                        return;
                    }
                }
            });

        still_matching.load(Ordering::Relaxed)
    }

    fn update_parity_shards(
        &self,
        matrix_rows: &[&[u8]],
        old_data: &[Vec<u8>],
        new_data: &[Vec<u8>],
        outputs: &mut [&mut [u8]],
        byte_count: usize,
    ) {
        if self.opts.max_workers > 1 && byte_count > self.opts.min_split_size {
            let tasks = split_outputs(outputs, &self.split_ranges(byte_count));
            tasks.into_par_iter().for_each(|(start, len, mut outs)| {
                update_chunk(matrix_rows, old_data, new_data, &mut outs, start, len);
            });
            return;
        }
        update_chunk(matrix_rows, old_data, new_data, outputs, 0, byte_count);
    }

    /// Contiguous `(start, len)` ranges covering `byte_count`, each at
    /// least `min_split_size` and rounded up to a multiple of 32
    fn split_ranges(&self, byte_count: usize) -> Vec<(usize, usize)> {
        let mut step = byte_count / self.opts.max_workers;
        if step < self.opts.min_split_size {
            step = self.opts.min_split_size;
        }
        step = (step + 31) & !31;

        let mut ranges = Vec::new();
        let mut start = 0;
        while start < byte_count {
            let len = step.min(byte_count - start);
            ranges.push((start, len));
            start += len;
        }
        ranges
    }
}

/// The scalar kernel: one pass over every (input column, output row) pair
fn code_chunk(matrix_rows: &[&[u8]], inputs: &[&[u8]], outputs: &mut [&mut [u8]], mode: WriteMode) {
    for (c, input) in inputs.iter().enumerate() {
        for (row, output) in matrix_rows.iter().zip(outputs.iter_mut()) {
            if c == 0 && mode == WriteMode::Overwrite {
                gal_mul_slice(row[c], input, output);
            } else {
                gal_mul_slice_xor(row[c], input, output);
            }
        }
    }
}

/// Apply the delta of each changed column to the parity range
fn update_chunk(
    matrix_rows: &[&[u8]],
    old_data: &[Vec<u8>],
    new_data: &[Vec<u8>],
    outputs: &mut [&mut [u8]],
    start: usize,
    len: usize,
) {
    let mut delta = vec![0u8; len];
    for (c, new) in new_data.iter().enumerate() {
        if new.is_empty() {
            continue;
        }
        let old = &old_data[c];
        for i in 0..len {
            delta[i] = new[start + i] ^ old[start + i];
        }
        for (row, output) in matrix_rows.iter().zip(outputs.iter_mut()) {
            gal_mul_slice_xor(row[c], &delta, output);
        }
    }
}

/// Slice every output into the per-range disjoint views the parallel
/// paths hand to their workers
fn split_outputs<'a>(
    outputs: &'a mut [&mut [u8]],
    ranges: &[(usize, usize)],
) -> Vec<(usize, usize, Vec<&'a mut [u8]>)> {
    let mut tasks = Vec::with_capacity(ranges.len());
    let mut rest: Vec<&mut [u8]> = outputs.iter_mut().map(|out| &mut out[..]).collect();
    for &(start, len) in ranges {
        let mut heads = Vec::with_capacity(rest.len());
        let mut tails = Vec::with_capacity(rest.len());
        for out in rest {
            let (head, tail) = out.split_at_mut(len);
            heads.push(head);
            tails.push(tail);
        }
        rest = tails;
        tasks.push((start, len, heads));
    }
    tasks
}
