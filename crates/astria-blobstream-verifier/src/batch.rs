//! Blobstream data commitment batches.
use std::fmt;

use tendermint::merkle::Proof as MerkleProof;

use crate::merkle_proof::{
    MerkleInclusionProof,
    MerkleProofError,
};

/// A Blobstream data commitment: the block range `[start, end)` whose data roots
/// were committed to under `nonce`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batch {
    start: u64,
    end: u64,
    nonce: u64,
}

impl Batch {
    /// Constructs a batch over the blocks `[start, end)`.
    ///
    /// # Errors
    /// Returns an error if the range is empty.
    pub fn new(start: u64, end: u64, nonce: u64) -> Result<Self, InvalidBatch> {
        if start >= end {
            return Err(InvalidBatch {
                start,
                end,
            });
        }
        Ok(Self {
            start,
            end,
            nonce,
        })
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The number of blocks in the batch.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always `false`: batches span at least one block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(&self, height: u64) -> bool {
        (self.start..self.end).contains(&height)
    }

    /// The position of `height` among the leaves of the data commitment.
    #[must_use]
    pub fn position(&self, height: u64) -> Option<u64> {
        self.contains(height).then(|| height - self.start)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) at nonce {}", self.start, self.end, self.nonce)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("batch range `[{start}, {end})` is empty")]
pub struct InvalidBatch {
    start: u64,
    end: u64,
}

/// The proof that the data root tuple of a block is a leaf of a batch's data
/// commitment, checked to be positioned at that block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRootInclusionProof {
    inner: MerkleInclusionProof,
}

impl DataRootInclusionProof {
    /// Converts the proof returned for block `height` of `batch` from its wire form.
    ///
    /// # Errors
    /// Returns an error if the proof is malformed, if its leaf is not the position
    /// of `height` in the batch, if its leaf count is not the size of the batch, or
    /// if its number of side nodes does not match the depth of the leaf.
    pub fn try_from_raw(
        raw: MerkleProof,
        height: u64,
        batch: Batch,
    ) -> Result<Self, DataRootInclusionProofError> {
        let inner =
            MerkleInclusionProof::try_from_raw(raw).map_err(DataRootInclusionProofError::raw)?;
        let Some(position) = batch.position(height) else {
            return Err(DataRootInclusionProofError::outside_batch(height, batch));
        };
        if inner.index() != position {
            return Err(DataRootInclusionProofError::index(position, inner.index()));
        }
        if inner.total() != batch.len() {
            return Err(DataRootInclusionProofError::total(batch.len(), inner.total()));
        }
        if inner.to_audit_proof().is_none() {
            return Err(DataRootInclusionProofError::structure(inner.aunts().len()));
        }
        Ok(Self {
            inner,
        })
    }

    /// The side nodes of the proof, in leaf-to-root order.
    #[must_use]
    pub fn aunts(&self) -> &[[u8; 32]] {
        self.inner.aunts()
    }

    /// The position of the proven leaf.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.inner.index()
    }

    /// The number of leaves of the data commitment.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.total()
    }

    /// Computes the root of the data commitment containing `leaf` at this proof's
    /// position.
    #[must_use]
    pub fn compute_root(&self, leaf: &[u8]) -> Option<[u8; 32]> {
        self.inner
            .to_audit_proof()
            .map(|proof| proof.compute_root(leaf))
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct DataRootInclusionProofError(DataRootInclusionProofErrorKind);

impl DataRootInclusionProofError {
    fn raw(source: MerkleProofError) -> Self {
        Self(DataRootInclusionProofErrorKind::Raw {
            source,
        })
    }

    fn outside_batch(height: u64, batch: Batch) -> Self {
        Self(DataRootInclusionProofErrorKind::OutsideBatch {
            height,
            batch,
        })
    }

    fn index(expected: u64, actual: u64) -> Self {
        Self(DataRootInclusionProofErrorKind::Index {
            expected,
            actual,
        })
    }

    fn total(expected: u64, actual: u64) -> Self {
        Self(DataRootInclusionProofErrorKind::Total {
            expected,
            actual,
        })
    }

    fn structure(num_aunts: usize) -> Self {
        Self(DataRootInclusionProofErrorKind::Structure {
            num_aunts,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum DataRootInclusionProofErrorKind {
    #[error("the proof is malformed")]
    Raw { source: MerkleProofError },
    #[error("height `{height}` is outside of batch `{batch}`")]
    OutsideBatch { height: u64, batch: Batch },
    #[error("the proof is for leaf `{actual}`, expected leaf `{expected}`")]
    Index { expected: u64, actual: u64 },
    #[error("the proof is for a tree of `{actual}` leaves, expected `{expected}`")]
    Total { expected: u64, actual: u64 },
    #[error("`{num_aunts}` side nodes do not match the depth of the proven leaf")]
    Structure { num_aunts: usize },
}
