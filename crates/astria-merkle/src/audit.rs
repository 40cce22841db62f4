//! Leaf-to-root inclusion proofs.
use crate::{
    combine,
    hash_leaf,
    split_point,
};

/// An error returned when constructing a [`Proof`] from untrusted parts.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InvalidProof(InvalidProofKind);

impl InvalidProof {
    fn empty_tree() -> Self {
        Self(InvalidProofKind::EmptyTree)
    }

    fn leaf_index_out_of_range(leaf_index: usize, tree_size: usize) -> Self {
        Self(InvalidProofKind::LeafIndexOutOfRange {
            leaf_index,
            tree_size,
        })
    }

    fn audit_path_length(expected: usize, actual: usize) -> Self {
        Self(InvalidProofKind::AuditPathLength {
            expected,
            actual,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum InvalidProofKind {
    #[error("a proof into an empty tree cannot exist")]
    EmptyTree,
    #[error("leaf index `{leaf_index}` is outside a tree of `{tree_size}` leaves")]
    LeafIndexOutOfRange { leaf_index: usize, tree_size: usize },
    #[error(
        "the leaf is at depth `{expected}` of the tree, but the audit path contains `{actual}` \
         hashes"
    )]
    AuditPathLength { expected: usize, actual: usize },
}

/// Which side of its parent a node on the path from the root to a leaf sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Returns the sides taken when walking from the root of a tree of `tree_size`
/// leaves down to the leaf at `leaf_index`, ordered root-to-leaf.
///
/// The length of the returned vector is the depth of the leaf.
pub(crate) fn path_to_leaf(mut leaf_index: usize, mut tree_size: usize) -> Vec<Side> {
    let mut path = Vec::new();
    while tree_size > 1 {
        let k = split_point(tree_size);
        if leaf_index < k {
            path.push(Side::Left);
            tree_size = k;
        } else {
            path.push(Side::Right);
            leaf_index -= k;
            tree_size -= k;
        }
    }
    path
}

/// An inclusion proof of a single leaf in a [`Tree`](crate::Tree).
///
/// The audit path holds the sibling hashes from the leaf up to the root, which is
/// the order used by both tendermint (`aunts`) and Blobstream (`sideNodes`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    audit_path: Vec<[u8; 32]>,
    leaf_index: usize,
    tree_size: usize,
}

impl Proof {
    /// Constructs a proof after checking that its parts describe a leaf in a tree.
    ///
    /// # Errors
    /// Returns an error if:
    /// + `tree_size` is zero;
    /// + `leaf_index` is not less than `tree_size`;
    /// + `audit_path` does not contain exactly one hash for each level between the leaf
    ///   and the root.
    ///
    /// # Examples
    /// ```
    /// # use astria_merkle::audit::Proof;
    /// assert!(Proof::new(vec![], 0, 1).is_ok());
    /// assert!(Proof::new(vec![[0; 32]], 0, 1).is_err());
    /// assert!(Proof::new(vec![[0; 32]], 1, 2).is_ok());
    /// assert!(Proof::new(vec![[0; 32]], 2, 2).is_err());
    /// // The last leaf of a tree of 5 leaves is a direct child of the root.
    /// assert!(Proof::new(vec![[0; 32]], 4, 5).is_ok());
    /// ```
    pub fn new(
        audit_path: Vec<[u8; 32]>,
        leaf_index: usize,
        tree_size: usize,
    ) -> Result<Self, InvalidProof> {
        if tree_size == 0 {
            return Err(InvalidProof::empty_tree());
        }
        if leaf_index >= tree_size {
            return Err(InvalidProof::leaf_index_out_of_range(
                leaf_index, tree_size,
            ));
        }
        let depth = path_to_leaf(leaf_index, tree_size).len();
        if depth != audit_path.len() {
            return Err(InvalidProof::audit_path_length(depth, audit_path.len()));
        }
        Ok(Self::new_unchecked(audit_path, leaf_index, tree_size))
    }

    pub(crate) fn new_unchecked(
        audit_path: Vec<[u8; 32]>,
        leaf_index: usize,
        tree_size: usize,
    ) -> Self {
        Self {
            audit_path,
            leaf_index,
            tree_size,
        }
    }

    /// Returns the sibling hashes of the proof, ordered leaf-to-root.
    #[must_use]
    pub fn audit_path(&self) -> &[[u8; 32]] {
        &self.audit_path
    }

    #[must_use]
    pub fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    #[must_use]
    pub fn tree_size(&self) -> usize {
        self.tree_size
    }

    /// Returns the number of hashes in the audit path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.audit_path.len()
    }

    /// Returns if the audit path is empty, which is the case for a tree with a single leaf.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.audit_path.is_empty()
    }

    /// Calculates the root of the tree that `leaf` is proven to be included in.
    #[must_use]
    pub fn compute_root(&self, leaf: &[u8]) -> [u8; 32] {
        self.compute_root_from_leaf_hash(hash_leaf(leaf))
    }

    /// Calculates the root of the tree from the leaf hash `MTH_i`.
    ///
    /// For a tree of a single leaf the root is the leaf hash itself.
    #[must_use]
    pub fn compute_root_from_leaf_hash(&self, leaf_hash: [u8; 32]) -> [u8; 32] {
        path_to_leaf(self.leaf_index, self.tree_size)
            .into_iter()
            .rev()
            .zip(&self.audit_path)
            .fold(leaf_hash, |node, (side, sibling)| match side {
                Side::Left => combine(&node, sibling),
                Side::Right => combine(sibling, &node),
            })
    }

    /// Returns if `leaf` is included in the tree with root `root`.
    #[must_use]
    pub fn verify(&self, leaf: &[u8], root: [u8; 32]) -> bool {
        self.compute_root(leaf) == root
    }
}
