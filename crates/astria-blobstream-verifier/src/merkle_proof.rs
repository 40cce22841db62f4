//! Tendermint style merkle proofs as returned by celestia-core.
use merkle::audit;
use tendermint::{
    merkle::Proof as MerkleProof,
    Hash,
};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct MerkleProofError(MerkleProofErrorKind);

impl MerkleProofError {
    fn empty_aunt(index: usize) -> Self {
        Self(MerkleProofErrorKind::EmptyAunt {
            index,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum MerkleProofErrorKind {
    #[error("aunt at index `{index}` was empty, expected a 32 byte hash")]
    EmptyAunt { index: usize },
}

/// A tendermint style merkle proof with all fields checked for well-formedness.
///
/// Whether the proof is structurally sound for its tree is only checked on
/// verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleInclusionProof {
    total: u64,
    index: u64,
    leaf_hash: Option<[u8; 32]>,
    aunts: Vec<[u8; 32]>,
}

impl MerkleInclusionProof {
    /// Converts a proof from its wire form.
    ///
    /// # Errors
    /// Returns an error if one of the aunts is empty.
    pub fn try_from_raw(raw: MerkleProof) -> Result<Self, MerkleProofError> {
        let MerkleProof {
            total,
            index,
            leaf_hash,
            aunts,
        } = raw;
        let leaf_hash = match leaf_hash {
            Hash::Sha256(hash) => Some(hash),
            Hash::None => None,
        };
        let aunts = aunts
            .into_iter()
            .enumerate()
            .map(|(i, aunt)| match aunt {
                Hash::Sha256(aunt) => Ok(aunt),
                Hash::None => Err(MerkleProofError::empty_aunt(i)),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            total,
            index,
            leaf_hash,
            aunts,
        })
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn aunts(&self) -> &[[u8; 32]] {
        &self.aunts
    }

    /// Returns the proof as an audit proof, if it is structurally valid.
    #[must_use]
    pub fn to_audit_proof(&self) -> Option<audit::Proof> {
        let index = usize::try_from(self.index).ok()?;
        let total = usize::try_from(self.total).ok()?;
        audit::Proof::new(self.aunts.clone(), index, total).ok()
    }

    /// Returns if this proof shows that `leaf` is included in the tree with `root`.
    ///
    /// The leaf hash reported by the node must match the hash of `leaf`.
    #[must_use]
    pub fn verify(&self, leaf: &[u8], root: [u8; 32]) -> bool {
        let leaf_hash = merkle::hash_leaf(leaf);
        if self.leaf_hash != Some(leaf_hash) {
            return false;
        }
        self.to_audit_proof()
            .is_some_and(|proof| proof.compute_root_from_leaf_hash(leaf_hash) == root)
    }
}
