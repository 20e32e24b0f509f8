//! Construction options for the encoder
//!
//! The matrix family is a tagged choice fixed at construction; everything
//! else tunes the parallel coder. Options use builder-style `with_*`
//! methods:
//!
//! ```
//! use reed_solomon_lrc::{Options, ReedSolomon};
//!
//! let r = ReedSolomon::with_options(
//!     10,
//!     4,
//!     Options::new().with_cauchy_matrix().with_max_workers(4),
//! ).unwrap();
//! assert_eq!(r.total_shard_count(), 14);
//! ```

use log::debug;

/// Which code-matrix family the encoder uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum MatrixKind {
    /// Systematic Vandermonde, the default
    #[default]
    Vandermonde,
    /// Cauchy matrix parity rows
    Cauchy,
    /// PARv1-compatible matrix (not MDS, kept bug-for-bug)
    Par1,
    /// Jerasure-compatible matrix, first parity is the XOR of all data
    Jerasure,
    /// Azure-LRC+1 locally recoverable code with one extra parity
    AzureLrcP1,
}

/// Options for the encoder, applied at construction time
#[derive(Clone, Debug)]
pub struct Options {
    pub(crate) matrix_kind: MatrixKind,
    pub(crate) max_workers: usize,
    pub(crate) min_split_size: usize,
    pub(crate) shard_size: usize,
    pub(crate) use_avx512: bool,
    pub(crate) use_sse2: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            matrix_kind: MatrixKind::default(),
            max_workers: rayon::current_num_threads(),
            min_split_size: 1024,
            shard_size: 0,
            use_avx512: false,
            use_sse2: false,
        }
    }
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Use Cauchy parity rows instead of the default Vandermonde rows
    pub fn with_cauchy_matrix(mut self) -> Options {
        self.matrix_kind = MatrixKind::Cauchy;
        self
    }

    /// Use the PARv1-compatible matrix. Not MDS; recovery can fail with
    /// enough shards present. Only useful for PARv1 interoperability.
    pub fn with_par1_matrix(mut self) -> Options {
        self.matrix_kind = MatrixKind::Par1;
        self
    }

    /// Use the Jerasure-compatible matrix
    pub fn with_jerasure_matrix(mut self) -> Options {
        self.matrix_kind = MatrixKind::Jerasure;
        self
    }

    /// Use the Azure-LRC+1 layout. The parity shard count passed to the
    /// constructor covers the global parities plus the three local
    /// parities.
    pub fn with_azure_lrc_p1_matrix(mut self) -> Options {
        self.matrix_kind = MatrixKind::AzureLrcP1;
        self
    }

    /// Hint that AVX-512 kernels may be used where available. The scalar
    /// table kernels are always the conformance baseline.
    pub fn with_avx512(mut self, enabled: bool) -> Options {
        self.use_avx512 = enabled;
        self
    }

    /// Hint that SSE2 kernels may be used where available
    pub fn with_sse2(mut self, enabled: bool) -> Options {
        self.use_sse2 = enabled;
        self
    }

    /// Expected shard size. When set, the worker budget is derived from it
    /// at construction time instead of using `max_workers` as given.
    pub fn with_shard_size(mut self, size: usize) -> Options {
        self.shard_size = size;
        self
    }

    /// Upper bound on concurrent workers inside one coder invocation
    pub fn with_max_workers(mut self, workers: usize) -> Options {
        self.max_workers = workers.max(1);
        self
    }

    /// Smallest byte range a single worker will take. Ranges are rounded
    /// up to a multiple of 32.
    pub fn with_min_split_size(mut self, size: usize) -> Options {
        self.min_split_size = size.max(1);
        self
    }

    /// Derive a worker count from the expected shard size: one input plus
    /// all parity outputs should fit in a per-core cache budget, rounded
    /// to a multiple of the pool size.
    pub(crate) fn tune_workers(&mut self, parity_shards: usize) {
        const CACHE_BUDGET: usize = 128 << 10;

        let pool = rayon::current_num_threads().max(1);
        let shards = 1 + parity_shards;
        let mut workers = (self.shard_size * shards) / (CACHE_BUDGET - (CACHE_BUDGET >> 4));
        workers *= 2;
        if workers < pool {
            workers = pool;
        }
        workers += pool - 1;
        workers -= workers % pool;

        debug!(
            "auto-tuned worker count to {workers} for shard size {}",
            self.shard_size
        );
        self.max_workers = workers;
    }
}
