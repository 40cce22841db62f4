//! RFC 6962 compliant merkle trees and the proofs used to tie Celestia data to
//! Blobstream attestations.
//!
//! This crate provides two things:
//!
//! + [`Tree`], a binary merkle tree with RFC 6962 hashing. It is used by Celestia
//!   to commit to the row and column roots of a block (the block's data root), and
//!   by Blobstream to commit to a range of `(height, data root)` tuples.
//! + [`audit::Proof`], a leaf-to-root inclusion proof into such a tree. Its wire
//!   representations are tendermint's `merkle.Proof` (`aunts`, `index`, `total`)
//!   and Blobstream's `BinaryMerkleProof` (`sideNodes`, `key`, `numLeaves`).
//!
//! Only sha256 is supported.
//!
//! # Usage
//! ```
//! use astria_merkle::Tree;
//! let tree = Tree::from_leaves(&[&[1; 32][..], &[4, 4, 4], b"helloworld"]);
//!
//! let root = tree.root();
//! let proof = tree
//!     .construct_proof(2)
//!     .expect("leaf 2 must be inside the tree");
//! assert!(proof.verify(b"helloworld", root));
//! assert!(!proof.verify(b"hello world", root));
//! ```
//!
//! # Tree shape
//! A tree over `n > 1` leaves is split into a left subtree containing the first `k`
//! leaves, where `k` is the largest power of two strictly less than `n`, and a right
//! subtree with the remaining `n - k` leaves. All left subtrees are thus perfect:
//! ```text
//!            root
//!           /    \
//!          .      \
//!        /   \     \
//!       .     .     .
//!      / \   / \   / \
//!     0   1 2   3 4   5
//! ```
//!
//! # Further reading:
//!
//! + RFC 6962: <https://datatracker.ietf.org/doc/html/rfc6962>

use sha2::{
    Digest as _,
    Sha256,
};

pub mod audit;

pub use audit::Proof;

/// Calculates `SHA256(0x00 | leaf)`
#[must_use]
pub fn hash_leaf(leaf: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([0x00_u8]);
    hasher.update(leaf);
    hasher.finalize().into()
}

/// Calculates `SHA256(0x01 || left || right)`.
#[must_use]
pub fn combine(left: &[u8], right: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([0x01_u8]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Returns the merkle tree hash of the empty tree, `SHA256()`.
#[must_use]
pub fn empty_root() -> [u8; 32] {
    Sha256::digest(b"").into()
}

/// Returns the number of leaves in the left subtree of a tree of `n` leaves.
///
/// This is the largest power of two strictly less than `n`. Trees with less than
/// two leaves are not split, and `0` is returned.
///
/// # Examples
/// ```
/// # use astria_merkle::split_point;
/// assert_eq!(0, split_point(1));
/// assert_eq!(1, split_point(2));
/// assert_eq!(2, split_point(3));
/// assert_eq!(4, split_point(8));
/// assert_eq!(8, split_point(9));
/// ```
#[must_use]
pub fn split_point(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    n.next_power_of_two() >> 1
}

/// A binary Merkle tree holding the hashes of its leaves.
///
/// Inner nodes are recomputed on demand. The trees constructed in this workspace
/// hold at most a few thousand leaves.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    leaves: Vec<[u8; 32]>,
}

impl Tree {
    /// Creates a new, empty merkle tree.
    ///
    /// # Examples
    /// ```
    /// # use astria_merkle::Tree;
    /// let tree = Tree::new();
    /// assert_eq!(0, tree.len());
    /// assert_eq!(astria_merkle::empty_root(), tree.root());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            leaves: Vec::new(),
        }
    }

    /// Constructs a Merkle tree from an iterator yielding byte slices.
    pub fn from_leaves<I, B>(iter: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut tree = Self::new();
        for item in iter {
            tree.push(item.as_ref());
        }
        tree
    }

    /// Pushes a new leaf into the tree.
    pub fn push(&mut self, leaf: &[u8]) {
        self.leaves.push(hash_leaf(leaf));
    }

    /// Returns the number of leaves in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Returns `MTH_i`, the merkle tree hash of the i-th leaf.
    ///
    /// Returns `None` if `i` falls outside the tree.
    ///
    /// # Examples
    /// ```
    /// use astria_merkle::{
    ///     hash_leaf,
    ///     Tree,
    /// };
    /// let tree = Tree::from_leaves([[1; 32], [2; 32]]);
    /// assert_eq!(Some(hash_leaf(&[1; 32])), tree.leaf(0));
    /// assert_eq!(Some(hash_leaf(&[2; 32])), tree.leaf(1));
    /// assert!(tree.leaf(2).is_none());
    /// ```
    #[must_use]
    pub fn leaf(&self, i: usize) -> Option<[u8; 32]> {
        self.leaves.get(i).copied()
    }

    /// Returns the root hash of the Merkle tree.
    ///
    /// If the tree is empty then the root is defined as the hash of the empty
    /// string, i.e. `MTH({}) = Sha256()`.
    #[must_use]
    pub fn root(&self) -> [u8; 32] {
        if self.is_empty() {
            return empty_root();
        }
        subtree_root(&self.leaves)
    }

    /// Constructs the inclusion proof for the i-th leaf of the tree.
    ///
    /// The audit path of the returned proof is ordered from the leaf's sibling
    /// up to the sibling of the root's child. Returns `None` if `i` is outside
    /// the tree.
    ///
    /// # Examples
    /// A tree with a single leaf returns an empty proof:
    /// ```
    /// # use astria_merkle::Tree;
    /// let tree = Tree::new();
    /// assert!(tree.construct_proof(0).is_none());
    ///
    /// let tree = Tree::from_leaves([[1u8]]);
    /// let proof = tree.construct_proof(0).expect("leaf 0 is inside the tree");
    /// assert!(proof.is_empty());
    /// ```
    #[must_use]
    pub fn construct_proof(&self, leaf_index: usize) -> Option<Proof> {
        if leaf_index >= self.len() {
            return None;
        }
        let mut audit_path = Vec::new();
        let mut leaves = &self.leaves[..];
        let mut index = leaf_index;
        while leaves.len() > 1 {
            let (left, right) = leaves.split_at(split_point(leaves.len()));
            if index < left.len() {
                audit_path.push(subtree_root(right));
                leaves = left;
            } else {
                audit_path.push(subtree_root(left));
                index -= left.len();
                leaves = right;
            }
        }
        audit_path.reverse();
        Some(Proof::new_unchecked(audit_path, leaf_index, self.len()))
    }
}

/// Calculates the root of a non-empty slice of leaf hashes.
fn subtree_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    match leaves {
        [] => empty_root(),
        [leaf] => *leaf,
        _ => {
            let (left, right) = leaves.split_at(split_point(leaves.len()));
            combine(&subtree_root(left), &subtree_root(right))
        }
    }
}
