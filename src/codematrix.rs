//! Builders for the supported code-matrix families
//!
//! Every builder returns a `total_shards x data_shards` matrix whose top
//! square is the identity, so encoding leaves the data shards unchanged.
//! The bottom rows are the parity generators; their structure is what
//! distinguishes the families.

use crate::errors::{Error, Result};
use crate::galois::{gal_divide, gal_exp, gal_inverse, gal_multiply};
use crate::matrix::Matrix;

/// The default systematic Vandermonde construction.
///
/// Start from a Vandermonde matrix (any square subset of rows is
/// invertible) and right-multiply by the inverse of its top square. The top
/// becomes the identity while the any-square-subset property is preserved.
pub(crate) fn vandermonde_systematic(data_shards: usize, total_shards: usize) -> Result<Matrix> {
    let vm = Matrix::vandermonde(total_shards, data_shards);
    let top = vm.sub_matrix(0, 0, data_shards, data_shards);
    vm.multiply(&top.invert()?)
}

/// The PARv1 construction: identity on top, transposed Vandermonde starting
/// at 1 below.
///
/// Kept for PARv1 compatibility only. The method is known to be buggy: some
/// square submatrices are singular, so recovery can fail even when enough
/// shards survive. The behavior is preserved bug-for-bug.
pub(crate) fn par1(data_shards: usize, total_shards: usize) -> Result<Matrix> {
    let mut result = Matrix::new(total_shards, data_shards);
    for r in 0..total_shards {
        if r < data_shards {
            result.set(r, r, 1);
        } else {
            for c in 0..data_shards {
                result.set(r, c, gal_exp((c + 1) as u8, r - data_shards));
            }
        }
    }
    Ok(result)
}

/// The Cauchy construction: identity on top, transposed Cauchy matrix below.
///
/// Every square submatrix of a Cauchy matrix is invertible, so the code is
/// MDS by construction.
pub(crate) fn cauchy(data_shards: usize, total_shards: usize) -> Result<Matrix> {
    let mut result = Matrix::new(total_shards, data_shards);
    for r in 0..total_shards {
        if r < data_shards {
            result.set(r, r, 1);
        } else {
            for c in 0..data_shards {
                result.set(r, c, gal_inverse((r ^ c) as u8));
            }
        }
    }
    Ok(result)
}

/// The Jerasure-library construction.
///
/// Starts from a Vandermonde matrix with the first row forced to
/// `[1, 0, ..., 0]` and the last row forced to `[0, ..., 0, 1]`, then
/// normalizes with column operations until the top square is the identity.
/// Row `data_shards` ends up all ones, so the first parity is the XOR of
/// all data shards. Building block for the AzureLRC+1 family.
pub(crate) fn jerasure(data_shards: usize, total_shards: usize) -> Result<Matrix> {
    let mut vm = Matrix::vandermonde(total_shards, data_shards);

    // Jerasure forces the first row to 100..00 and the last to 000..01
    vm.set(0, 0, 1);
    for c in 1..data_shards {
        vm.set(0, c, 0);
    }
    for c in 0..data_shards - 1 {
        vm.set(total_shards - 1, c, 0);
    }
    vm.set(total_shards - 1, data_shards - 1, 1);

    for i in 0..data_shards {
        // Find the first row at or below i with a nonzero entry in column i
        let mut r = i;
        while r < total_shards && vm.get(r, i) == 0 {
            r += 1;
        }
        if r == total_shards {
            return Err(Error::SingularMatrix);
        }
        if r != i {
            vm.swap_rows(r, i);
        }
        // Column operations standing in for multiplying by the inverted
        // top square
        if vm.get(i, i) != 1 {
            let scale = gal_divide(1, vm.get(i, i));
            for j in 0..total_shards {
                vm.set(j, i, gal_multiply(vm.get(j, i), scale));
            }
        }
        for j in 0..data_shards {
            let factor = vm.get(i, j);
            if j != i && factor != 0 {
                for r in 0..total_shards {
                    let updated = vm.get(r, j) ^ gal_multiply(factor, vm.get(r, i));
                    vm.set(r, j, updated);
                }
            }
        }
    }

    // Scale each column so row `data_shards` becomes all ones
    for j in 0..data_shards {
        let factor = vm.get(data_shards, j);
        if factor != 1 {
            let scale = gal_divide(1, factor);
            for i in data_shards..total_shards {
                vm.set(i, j, gal_multiply(vm.get(i, j), scale));
            }
        }
    }

    // Scale each remaining parity row so its first column is one
    for i in data_shards + 1..total_shards {
        let factor = vm.get(i, 0);
        if factor != 1 {
            let scale = gal_divide(1, factor);
            for j in 0..data_shards {
                vm.set(i, j, gal_multiply(vm.get(i, j), scale));
            }
        }
    }

    Ok(vm)
}

/// Jerasure matrix with the all-ones XOR row removed.
///
/// Builds a `(total_shards + 1) x data_shards` Jerasure matrix and deletes
/// row `data_shards` (the XOR-sum row). The surviving parity rows keep the
/// property that any `data_shards` rows of the data+parity region form an
/// invertible matrix. These are the global parity generators of AzureLRC+1.
fn special_jerasure(data_shards: usize, total_shards: usize) -> Result<Matrix> {
    let vm = jerasure(data_shards, total_shards + 1)?;

    let mut result = Matrix::new(total_shards, data_shards);
    for r in 0..total_shards {
        let source = if r < data_shards { r } else { r + 1 };
        for c in 0..data_shards {
            result.set(r, c, vm.get(source, c));
        }
    }
    Ok(result)
}

/// The full `(n + m + l) x n` AzureLRC+1 matrix for parameters
/// `(n, m, l) = (data_shards, global_parity_shards, local_parity_shards)`.
///
/// Layout, top to bottom:
/// 1. rows `[0, n)`: identity (data shards),
/// 2. rows `[n, n+m)`: global parities from [`special_jerasure`],
/// 3. rows `[n+m, n+m+l-1)`: DATA-AZ local parities, each the 0/1 mask of
///    one AZ's `n / (l-1)` data columns,
/// 4. row `n+m+l-1`: PARITY-AZ local parity, the GF sum of the global
///    parity rows. The field has characteristic 2, so the encoded shard
///    equals the XOR of the global parity shards.
///
/// Constraints carried over from the construction: each AZ holds the same
/// number of data shards, so `n` must be divisible by `l - 1`.
pub(crate) fn azure_lrc_p1(
    data_shards: usize,
    global_parity_shards: usize,
    local_parity_shards: usize,
) -> Result<Matrix> {
    let n = data_shards;
    let m = global_parity_shards;
    let l = local_parity_shards;

    let global = special_jerasure(n, n + m)?;

    let mut vm = Matrix::new(n + m + l, n);
    for r in 0..n + m {
        for c in 0..n {
            vm.set(r, c, global.get(r, c));
        }
    }

    // DATA-AZ local parities: XOR of each AZ's data columns
    let local_data_num = n / (l - 1);
    for row in 0..l - 1 {
        for col in 0..n {
            let value = u8::from(col / local_data_num == row);
            vm.set(n + m + row, col, value);
        }
    }

    // PARITY-AZ local parity: sum of the global parity rows
    for row in n..n + m {
        for col in 0..n {
            let updated = vm.get(n + m + l - 1, col) ^ vm.get(row, col);
            vm.set(n + m + l - 1, col, updated);
        }
    }

    Ok(vm)
}
