//! Reconstruction drivers: full, partial, and survivor selection
//!
//! Full reconstruction scans for the first `data_shards` surviving rows,
//! inverts the induced submatrix (through the inversion cache) and runs the
//! coder with the missing shards as outputs. Partial reconstruction
//! computes only the contribution of the survivors that are actually
//! present, XOR-ing it into the caller's accumulator buffers so cross-AZ
//! repairs can be summed piecewise. Survivor selection finds a set of rows
//! that is actually invertible, preferring AZ-local reads for single
//! failures of the Azure-LRC+1 code.

use std::sync::Arc;

use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::encoder::{ReedSolomon, WriteMode};
use crate::errors::{Error, Result};
use crate::matrix::Matrix;
use crate::options::MatrixKind;
use crate::shards::{check_shards, shard_size};

impl ReedSolomon {
    /// Recreate all missing shards, if possible
    ///
    /// A shard is marked missing by leaving it zero-length. A zero-length
    /// shard whose capacity already covers the shard size is reused in
    /// place; otherwise a new buffer is allocated. With fewer than
    /// `data_shards` shards present, reconstruction fails with
    /// [`Error::TooFewShards`].
    ///
    /// The reconstructed set is complete but unverified; run
    /// [`verify`](ReedSolomon::verify) to check integrity.
    pub fn reconstruct(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        self.reconstruct_impl(shards, false)
    }

    /// Recreate only the missing data shards
    ///
    /// Missing parity shards stay missing, so a subsequent
    /// [`verify`](ReedSolomon::verify) over the set is expected to fail.
    pub fn reconstruct_data(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        self.reconstruct_impl(shards, true)
    }

    fn reconstruct_impl(&self, shards: &mut [Vec<u8>], data_only: bool) -> Result<()> {
        if shards.len() != self.total_shards {
            return Err(Error::TooFewShards);
        }
        check_shards(shards, true)?;

        let byte_count = shard_size(shards);

        let present = shards.iter().filter(|shard| !shard.is_empty()).count();
        if present == self.total_shards {
            return Ok(());
        }
        if present < self.data_shards {
            return Err(Error::TooFewShards);
        }

        // Accept the first data_shards present rows as decode inputs; the
        // absent rows seen along the way form the cache key.
        let mut valid_indices = Vec::with_capacity(self.data_shards);
        let mut invalid_indices = Vec::new();
        let mut row = 0;
        while row < self.total_shards && valid_indices.len() < self.data_shards {
            if shards[row].is_empty() {
                invalid_indices.push(row);
            } else {
                valid_indices.push(row);
            }
            row += 1;
        }

        let decode_matrix = self.decode_matrix_for(&invalid_indices, &valid_indices)?;

        // Missing data shards come back through the decode matrix, fed by
        // the surviving shards.
        let mut outputs: Vec<(usize, Vec<u8>)> = Vec::new();
        let mut matrix_rows: Vec<&[u8]> = Vec::new();
        for i in 0..self.data_shards {
            if shards[i].is_empty() {
                outputs.push((i, take_output_buffer(&mut shards[i], byte_count)));
                matrix_rows.push(decode_matrix.row(i));
            }
        }
        {
            let inputs: Vec<&[u8]> = valid_indices.iter().map(|&v| shards[v].as_slice()).collect();
            let mut views: Vec<&mut [u8]> =
                outputs.iter_mut().map(|(_, buf)| buf.as_mut_slice()).collect();
            self.code_some_shards(&matrix_rows, &inputs, &mut views, byte_count, WriteMode::Overwrite);
        }
        for (i, buf) in outputs {
            shards[i] = buf;
        }

        if data_only {
            return Ok(());
        }

        // With the data complete again, missing parity is a plain re-encode
        // of the affected rows.
        let mut outputs: Vec<(usize, Vec<u8>)> = Vec::new();
        let mut matrix_rows: Vec<&[u8]> = Vec::new();
        for i in self.data_shards..self.total_shards {
            if shards[i].is_empty() {
                outputs.push((i, take_output_buffer(&mut shards[i], byte_count)));
                matrix_rows.push(&self.parity_rows[i - self.data_shards]);
            }
        }
        {
            let inputs: Vec<&[u8]> = shards[..self.data_shards]
                .iter()
                .map(Vec::as_slice)
                .collect();
            let mut views: Vec<&mut [u8]> =
                outputs.iter_mut().map(|(_, buf)| buf.as_mut_slice()).collect();
            self.code_some_shards(&matrix_rows, &inputs, &mut views, byte_count, WriteMode::Overwrite);
        }
        for (i, buf) in outputs {
            shards[i] = buf;
        }
        Ok(())
    }

    /// Compute the contribution of the present survivors to the shards at
    /// `bad_idx`, XOR-ing it into their buffers
    ///
    /// `survival_idx` names the full hypothetical survivor set (exactly
    /// `data_shards` strictly increasing indices) that determines the
    /// decode matrix; the shards actually present may be any subset of it.
    /// Absent survivors count as zero-filled input. Shards at `bad_idx`
    /// are accumulators: a present buffer keeps its contents and receives
    /// this call's contribution, an absent one starts from zero. Summing
    /// the calls for a partition of the survivors therefore equals one
    /// call with every survivor present, which is what cross-AZ repair
    /// pipelines rely on.
    pub fn partial_reconstruct(
        &self,
        shards: &mut [Vec<u8>],
        survival_idx: &[usize],
        bad_idx: &[usize],
    ) -> Result<()> {
        if shards.len() != self.total_shards {
            return Err(Error::TooFewShards);
        }
        for window in survival_idx.windows(2) {
            if window[1] <= window[0] {
                return Err(Error::IndexNotIncremental);
            }
        }
        for window in bad_idx.windows(2) {
            if window[1] <= window[0] {
                return Err(Error::IndexNotIncremental);
            }
        }
        if survival_idx.iter().chain(bad_idx).any(|&i| i >= self.total_shards) {
            return Err(Error::InvalidInput);
        }

        let present = shards.iter().filter(|shard| !shard.is_empty()).count();
        if present == self.total_shards {
            return Ok(());
        }

        let survival: FxHashSet<usize> = survival_idx.iter().copied().collect();
        let bad: FxHashSet<usize> = bad_idx.iter().copied().collect();
        if survival_idx.iter().any(|i| bad.contains(i)) {
            return Err(Error::InvalidInput);
        }
        for (i, shard) in shards.iter().enumerate() {
            if !shard.is_empty() && !survival.contains(&i) && !bad.contains(&i) {
                return Err(Error::ShardsNotSurvival);
            }
        }
        if survival_idx.len() != self.data_shards {
            return Err(Error::TooFewShards);
        }

        let byte_count = shard_size(shards);
        if byte_count == 0 {
            return Err(Error::ShardNoData);
        }

        // The decode matrix is keyed by everything outside the survivor
        // set, shared with full reconstruction for the same pattern.
        let invalid_indices: Vec<usize> = (0..self.total_shards)
            .filter(|i| !survival.contains(i))
            .collect();
        let decode_matrix = self.decode_matrix_for(&invalid_indices, survival_idx)?;

        // Rows of the code matrix for the shards being rebuilt, composed
        // with the decode matrix: survivor shards in, bad shards out.
        let mut invalid_encode = Matrix::new(bad_idx.len(), self.data_shards);
        for (r, &bad_index) in bad_idx.iter().enumerate() {
            for c in 0..self.data_shards {
                invalid_encode.set(r, c, self.matrix.get(bad_index, c));
            }
        }
        let partial_decode = invalid_encode.multiply(&decode_matrix)?;
        trace!(
            "partial decode matrix is {}x{} for bad {:?}",
            partial_decode.rows(),
            partial_decode.cols(),
            bad_idx
        );

        let mut outputs: Vec<(usize, Vec<u8>)> = Vec::new();
        for &i in bad_idx {
            let mut buf = std::mem::take(&mut shards[i]);
            if buf.len() != byte_count {
                buf = take_buffer_zeroed(buf, byte_count);
            }
            outputs.push((i, buf));
        }

        let zeros = vec![0u8; byte_count];
        {
            let inputs: Vec<&[u8]> = survival_idx
                .iter()
                .map(|&idx| {
                    if shards[idx].is_empty() {
                        zeros.as_slice()
                    } else {
                        shards[idx].as_slice()
                    }
                })
                .collect();
            let matrix_rows: Vec<&[u8]> =
                (0..bad_idx.len()).map(|r| partial_decode.row(r)).collect();
            let mut views: Vec<&mut [u8]> =
                outputs.iter_mut().map(|(_, buf)| buf.as_mut_slice()).collect();
            self.code_some_shards(
                &matrix_rows,
                &inputs,
                &mut views,
                byte_count,
                WriteMode::Accumulate,
            );
        }
        for (i, buf) in outputs {
            shards[i] = buf;
        }
        Ok(())
    }

    /// Select survivor rows that form an invertible decode matrix
    ///
    /// Returns `(select_shards, read_shards)`: the survivor indices that
    /// determine the decode matrix, and the shards that actually need to
    /// be read. For a single Azure-LRC+1 failure the selection is steered
    /// so that only the failed shard's own AZ is read; `read_shards` is
    /// then the rest of that AZ. In every other case the two lists are
    /// identical. Fails with [`Error::SingularMatrix`] when every
    /// candidate combination is singular.
    pub fn get_survival_shards(
        &self,
        bad_index: &[usize],
        az_layout: &[Vec<usize>],
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        if bad_index.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        if self.total_shards - bad_index.len() < self.data_shards {
            return Err(Error::TooFewShards);
        }

        let bad: FxHashSet<usize> = bad_index.iter().copied().collect();

        // Single Azure-LRC+1 failure: the rest of the failed shard's AZ is
        // both necessary and sufficient for local repair, so only accept
        // combinations that contain it.
        let mut for_computation: Vec<usize> = Vec::new();
        if bad_index.len() == 1 && self.opts.matrix_kind == MatrixKind::AzureLrcP1 {
            if let Some(layout) = az_layout.iter().find(|az| az.contains(&bad_index[0])) {
                for_computation = layout
                    .iter()
                    .copied()
                    .filter(|&shard| shard != bad_index[0])
                    .collect();
            }
        }

        let survivors: Vec<usize> = (0..self.total_shards).filter(|i| !bad.contains(i)).collect();
        let k = self.data_shards;
        if let Some(count) = combination_count(survivors.len(), k) {
            debug!(
                "searching up to {count} survivor combinations for failed shards {:?}",
                bad_index
            );
        }

        let mut combination: Vec<usize> = (0..k).collect();
        let mut selected: Option<Vec<usize>> = None;
        loop {
            let candidate: Vec<usize> = combination.iter().map(|&s| survivors[s]).collect();
            let mut sub_matrix = Matrix::new(k, k);
            for (r, &idx) in candidate.iter().enumerate() {
                for c in 0..k {
                    sub_matrix.set(r, c, self.matrix.get(idx, c));
                }
            }
            if sub_matrix.invert().is_ok()
                && for_computation.iter().all(|s| candidate.contains(s))
            {
                selected = Some(candidate);
                break;
            }
            if !next_combination(&mut combination, survivors.len()) {
                break;
            }
        }

        match selected {
            None => Err(Error::SingularMatrix),
            Some(select) => {
                let read = if for_computation.is_empty() {
                    select.clone()
                } else {
                    for_computation
                };
                Ok((select, read))
            }
        }
    }

    /// Fetch the decode matrix for a failure pattern, building and caching
    /// it on a miss
    fn decode_matrix_for(
        &self,
        invalid_indices: &[usize],
        valid_indices: &[usize],
    ) -> Result<Arc<Matrix>> {
        if let Some(cached) = self.tree.get_inverted_matrix(invalid_indices) {
            return Ok(cached);
        }
        debug!("inversion cache miss for failure pattern {invalid_indices:?}");

        let mut sub_matrix = Matrix::new(self.data_shards, self.data_shards);
        for (r, &valid) in valid_indices.iter().enumerate() {
            for c in 0..self.data_shards {
                sub_matrix.set(r, c, self.matrix.get(valid, c));
            }
        }
        let decode_matrix = Arc::new(sub_matrix.invert()?);
        self.tree
            .insert_inverted_matrix(invalid_indices, Arc::clone(&decode_matrix));
        Ok(decode_matrix)
    }
}

/// Reuse a zero-length shard buffer when its capacity suffices, otherwise
/// allocate. Either way the result is `byte_count` zeroed bytes.
fn take_output_buffer(shard: &mut Vec<u8>, byte_count: usize) -> Vec<u8> {
    take_buffer_zeroed(std::mem::take(shard), byte_count)
}

fn take_buffer_zeroed(mut buf: Vec<u8>, byte_count: usize) -> Vec<u8> {
    if buf.capacity() >= byte_count {
        buf.clear();
        buf.resize(byte_count, 0);
        buf
    } else {
        vec![0u8; byte_count]
    }
}

/// Overflow-checked binomial coefficient
fn combination_count(n: usize, k: usize) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut count: u128 = 1;
    for i in 1..=k {
        count = count.checked_mul((n - k + i) as u128)? / i as u128;
    }
    Some(count)
}

/// Advance to the next k-combination of `0..n` in lexicographic order.
/// Returns false once the last combination has been visited.
fn next_combination(combination: &mut [usize], n: usize) -> bool {
    let k = combination.len();
    let mut j = k;
    while j > 0 && combination[j - 1] == n - k + (j - 1) {
        j -= 1;
    }
    if j == 0 {
        return false;
    }
    combination[j - 1] += 1;
    for t in j..k {
        combination[t] = combination[t - 1] + 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combination_count() {
        assert_eq!(combination_count(5, 2), Some(10));
        assert_eq!(combination_count(11, 6), Some(462));
        assert_eq!(combination_count(4, 0), Some(1));
        assert_eq!(combination_count(3, 5), Some(0));
        assert_eq!(combination_count(256, 128), None);
    }

    #[test]
    fn test_next_combination_enumerates_all() {
        let mut combination = vec![0, 1];
        let mut seen = vec![combination.clone()];
        while next_combination(&mut combination, 4) {
            seen.push(combination.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn test_take_buffer_reuses_capacity() {
        let buf = Vec::with_capacity(64);
        let ptr = buf.as_ptr();
        let out = take_buffer_zeroed(buf, 32);
        assert_eq!(out.len(), 32);
        assert!(out.iter().all(|&b| b == 0));
        assert_eq!(out.as_ptr(), ptr);

        let small = Vec::with_capacity(8);
        let out = take_buffer_zeroed(small, 32);
        assert_eq!(out.len(), 32);
    }
}
