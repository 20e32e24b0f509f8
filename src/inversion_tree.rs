//! Cache of inverted decode matrices keyed by failure pattern
//!
//! Reconstruction with the same set of missing shards always needs the same
//! inverted submatrix, so the tree memoizes them. Keys are the sorted lists
//! of invalid shard indices; the root represents "nothing invalid" and
//! holds the identity. Each node fans out by shard index, so a key of
//! length `d` lives at depth `d`.
//!
//! Lookups take the read side of an `RwLock`, inserts the write side.
//! Matrices are handed out as `Arc`s, so a reader drops the lock before the
//! decode matrix is used. Two racing inserts of the same key both compute
//! the same inverse; the second simply overwrites the first.

use std::sync::{Arc, RwLock};

use crate::matrix::Matrix;

pub(crate) struct InversionTree {
    root: RwLock<InversionNode>,
    shards: usize,
}

struct InversionNode {
    matrix: Option<Arc<Matrix>>,
    children: Vec<Option<Box<InversionNode>>>,
}

impl InversionNode {
    fn new(shards: usize) -> InversionNode {
        InversionNode {
            matrix: None,
            children: (0..shards).map(|_| None).collect(),
        }
    }
}

impl InversionTree {
    /// Create a tree whose root holds the identity matrix: with no invalid
    /// shards, decoding is a no-op.
    pub(crate) fn new(data_shards: usize, parity_shards: usize) -> InversionTree {
        let shards = data_shards + parity_shards;
        let mut root = InversionNode::new(shards);
        root.matrix = Some(Arc::new(Matrix::identity(data_shards)));
        InversionTree {
            root: RwLock::new(root),
            shards,
        }
    }

    /// Look up the cached decode matrix for a sorted list of invalid
    /// indices. Returns `None` on a cache miss.
    pub(crate) fn get_inverted_matrix(&self, invalid_indices: &[usize]) -> Option<Arc<Matrix>> {
        let root = self.root.read().unwrap_or_else(|e| e.into_inner());
        let mut node = &*root;
        for &index in invalid_indices {
            node = node.children[index].as_deref()?;
        }
        node.matrix.clone()
    }

    /// Insert a decode matrix keyed by a sorted list of invalid indices.
    ///
    /// An empty key addresses the root, which permanently holds the
    /// identity; such inserts are ignored.
    pub(crate) fn insert_inverted_matrix(&self, invalid_indices: &[usize], matrix: Arc<Matrix>) {
        if invalid_indices.is_empty() {
            return;
        }
        debug_assert!(matrix.is_square());

        let shards = self.shards;
        let mut root = self.root.write().unwrap_or_else(|e| e.into_inner());
        let mut node = &mut *root;
        for &index in invalid_indices {
            node = &mut **node.children[index]
                .get_or_insert_with(|| Box::new(InversionNode::new(shards)));
        }
        node.matrix = Some(matrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_holds_identity() {
        let tree = InversionTree::new(3, 2);
        let root = tree.get_inverted_matrix(&[]).unwrap();
        assert_eq!(*root, Matrix::identity(3));
    }

    #[test]
    fn test_miss_then_insert_then_hit() {
        let tree = InversionTree::new(3, 2);
        assert!(tree.get_inverted_matrix(&[1]).is_none());

        let m = Arc::new(Matrix::identity(3));
        tree.insert_inverted_matrix(&[1], Arc::clone(&m));
        let cached = tree.get_inverted_matrix(&[1]).unwrap();
        assert_eq!(*cached, *m);
    }

    #[test]
    fn test_deep_keys_are_distinct() {
        let tree = InversionTree::new(3, 2);
        let mut a = Matrix::identity(3);
        a.set(0, 1, 7);
        let mut b = Matrix::identity(3);
        b.set(2, 0, 9);

        tree.insert_inverted_matrix(&[0, 4], Arc::new(a.clone()));
        tree.insert_inverted_matrix(&[0, 3], Arc::new(b.clone()));

        assert_eq!(*tree.get_inverted_matrix(&[0, 4]).unwrap(), a);
        assert_eq!(*tree.get_inverted_matrix(&[0, 3]).unwrap(), b);
        // The prefix node exists but has no matrix of its own
        assert!(tree.get_inverted_matrix(&[0]).is_none());
    }

    #[test]
    fn test_empty_key_insert_is_ignored() {
        let tree = InversionTree::new(3, 2);
        let mut not_identity = Matrix::identity(3);
        not_identity.set(0, 1, 1);
        tree.insert_inverted_matrix(&[], Arc::new(not_identity));
        assert_eq!(*tree.get_inverted_matrix(&[]).unwrap(), Matrix::identity(3));
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        use std::thread;

        let tree = InversionTree::new(4, 4);
        thread::scope(|s| {
            for t in 0..4 {
                let tree = &tree;
                s.spawn(move || {
                    for i in 0..100 {
                        let key = [t, 4 + (i % 4)];
                        tree.insert_inverted_matrix(&key, Arc::new(Matrix::identity(4)));
                        assert!(tree.get_inverted_matrix(&key).is_some());
                    }
                });
            }
        });
    }
}
