//! Validation of the proofs returned by the `prove_shares` RPC.
//!
//! A [`ShareProof`] ties a contiguous range of shares of the original data square
//! to the data root of a block in two steps. Every row touched by the range has a
//! namespaced merkle proof of the shares it contains against the row root. Every
//! row root has an RFC 6962 proof against the data root, which commits to the
//! `2w` row roots followed by the `2w` column roots of the extended square.
use celestia_client::proof::NmtProof;
use celestia_types::nmt::{
    Namespace,
    NS_SIZE,
};
use nmt_rs::{
    simple_merkle::proof::Proof,
    NamespaceProof,
    NamespacedHash,
    NamespacedSha2Hasher,
};

use crate::{
    merkle_proof::{
        MerkleInclusionProof,
        MerkleProofError,
    },
    square::{
        ShareRange,
        SHARE_SIZE,
    },
};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ShareProofError(ShareProofErrorKind);

impl ShareProofError {
    fn share_length(index: usize, actual: usize) -> Self {
        Self(ShareProofErrorKind::ShareLength {
            index,
            actual,
        })
    }

    fn namespace(source: celestia_types::Error) -> Self {
        Self(ShareProofErrorKind::Namespace {
            source,
        })
    }

    fn namespace_version(version: u32) -> Self {
        Self(ShareProofErrorKind::NamespaceVersion {
            version,
        })
    }

    fn negative_bound(row: usize) -> Self {
        Self(ShareProofErrorKind::NegativeBound {
            row,
        })
    }

    fn nmt_node(row: usize, source: nmt_rs::InvalidNamespacedHash) -> Self {
        Self(ShareProofErrorKind::NmtNode {
            row,
            source,
        })
    }

    fn row_root(row: usize, source: nmt_rs::InvalidNamespacedHash) -> Self {
        Self(ShareProofErrorKind::RowRoot {
            row,
            source,
        })
    }

    fn row_proof(row: usize, source: MerkleProofError) -> Self {
        Self(ShareProofErrorKind::RowProof {
            row,
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum ShareProofErrorKind {
    #[error("share at index `{index}` has `{actual}` bytes, expected {SHARE_SIZE}")]
    ShareLength { index: usize, actual: usize },
    #[error("the proven namespace is malformed")]
    Namespace { source: celestia_types::Error },
    #[error("namespace version `{version}` does not fit into a byte")]
    NamespaceVersion { version: u32 },
    #[error("the share proof of row `{row}` has a negative bound")]
    NegativeBound { row: usize },
    #[error("a node of the share proof of row `{row}` is malformed")]
    NmtNode {
        row: usize,
        source: nmt_rs::InvalidNamespacedHash,
    },
    #[error("row root `{row}` is malformed")]
    RowRoot {
        row: usize,
        source: nmt_rs::InvalidNamespacedHash,
    },
    #[error("the inclusion proof of row root `{row}` is malformed")]
    RowProof {
        row: usize,
        source: MerkleProofError,
    },
}

type RowRoot = NamespacedHash<NS_SIZE>;

/// A range proof into the namespaced merkle tree of a single row.
#[derive(Clone, Debug)]
struct RangeProof {
    start: usize,
    end: usize,
    nodes: Vec<RowRoot>,
}

impl RangeProof {
    fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns if the nodes are sorted by namespace around the proven range.
    ///
    /// Every node must span an ordered namespace range, the nodes must follow each
    /// other in namespace order, the nodes left of the range must end at or before
    /// `namespace`, and the nodes right of it must start at or after it. Hashing
    /// nodes that violate this order is not defined.
    fn nodes_are_ordered_around(&self, namespace: &nmt_rs::NamespaceId<NS_SIZE>) -> bool {
        if self
            .nodes
            .iter()
            .any(|node| node.min_namespace() > node.max_namespace())
        {
            return false;
        }
        if self
            .nodes
            .windows(2)
            .any(|pair| pair[0].max_namespace() > pair[1].min_namespace())
        {
            return false;
        }
        let num_left = usize::try_from(self.start.count_ones())
            .unwrap_or(usize::MAX)
            .min(self.nodes.len());
        let (left, right) = self.nodes.split_at(num_left);
        left.last()
            .map_or(true, |node| node.max_namespace() <= *namespace)
            && right
                .first()
                .map_or(true, |node| node.min_namespace() >= *namespace)
    }

    /// Returns if `shares`, all under `namespace`, are the leaves `[start, end)` of
    /// the row with `root`.
    fn verify_inclusion(&self, root: &RowRoot, namespace: Namespace, shares: &[Vec<u8>]) -> bool {
        let namespace: nmt_rs::NamespaceId<NS_SIZE> = namespace.into();
        if self.is_empty()
            || shares.len() != self.len()
            || !self.nodes_are_ordered_around(&namespace)
        {
            return false;
        }
        let (Ok(start), Ok(end)) = (u32::try_from(self.start), u32::try_from(self.end)) else {
            return false;
        };
        let proof = NamespaceProof::<NamespacedSha2Hasher<NS_SIZE>, NS_SIZE>::PresenceProof {
            proof: Proof {
                siblings: self.nodes.clone(),
                range: start..end,
            },
            ignore_max_ns: true,
        };
        proof.verify_range(root, shares, namespace).is_ok()
    }
}

#[derive(Clone, Debug)]
struct RowProof {
    row_roots: Vec<RowRoot>,
    proofs: Vec<MerkleInclusionProof>,
    start_row: u32,
    end_row: u32,
}

/// The proof that a range of shares is part of the original data square of a block.
#[derive(Clone, Debug)]
pub struct ShareProof {
    shares: Vec<Vec<u8>>,
    share_proofs: Vec<RangeProof>,
    namespace: Namespace,
    row_proof: RowProof,
}

impl ShareProof {
    /// Converts a share proof from its wire form, checking that all shares, hashes
    /// and the namespace are well formed.
    ///
    /// # Errors
    /// Returns an error if a share is not 512 bytes, if the namespace is malformed,
    /// if a proof bound is negative, or if any hash has the wrong length.
    pub fn try_from_raw(raw: celestia_client::ShareProof) -> Result<Self, ShareProofError> {
        let celestia_client::ShareProof {
            data,
            share_proofs,
            namespace_id,
            row_proof,
            namespace_version,
        } = raw;

        if let Some((index, share)) = data
            .iter()
            .enumerate()
            .find(|(_, share)| share.len() != SHARE_SIZE)
        {
            return Err(ShareProofError::share_length(index, share.len()));
        }

        let namespace_version = u8::try_from(namespace_version)
            .map_err(|_| ShareProofError::namespace_version(namespace_version))?;
        let namespace = Namespace::new(namespace_version, &namespace_id)
            .map_err(ShareProofError::namespace)?;

        let share_proofs = share_proofs
            .into_iter()
            .enumerate()
            .map(|(row, proof)| range_proof_from_raw(row, proof))
            .collect::<Result<_, _>>()?;

        let row_roots = row_proof
            .row_roots
            .iter()
            .enumerate()
            .map(|(row, root)| {
                RowRoot::try_from(&root.0[..])
                    .map_err(|source| ShareProofError::row_root(row, source))
            })
            .collect::<Result<_, _>>()?;
        let proofs = row_proof
            .proofs
            .into_iter()
            .enumerate()
            .map(|(row, proof)| {
                MerkleInclusionProof::try_from_raw(proof)
                    .map_err(|source| ShareProofError::row_proof(row, source))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            shares: data,
            share_proofs,
            namespace,
            row_proof: RowProof {
                row_roots,
                proofs,
                start_row: row_proof.start_row,
                end_row: row_proof.end_row,
            },
        })
    }

    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns if the proof shows that its shares are included in the square of the
    /// block with `data_root`.
    ///
    /// This checks that there is one share proof and one row root per row, that the
    /// share proofs account for every share, that every row root is committed to by
    /// `data_root`, and that the shares of every row are included under the proven
    /// namespace in that row.
    #[must_use]
    pub fn verify(&self, data_root: [u8; 32]) -> bool {
        let Some(num_rows) = self
            .row_proof
            .end_row
            .checked_sub(self.row_proof.start_row)
            .and_then(|rows| usize::try_from(rows).ok())
            .map(|rows| rows + 1)
        else {
            return false;
        };
        if self.share_proofs.len() != num_rows
            || self.row_proof.row_roots.len() != num_rows
            || self.row_proof.proofs.len() != num_rows
        {
            return false;
        }
        if self.share_proofs.iter().any(RangeProof::is_empty) {
            return false;
        }
        let num_proven_shares: usize = self.share_proofs.iter().map(RangeProof::len).sum();
        if num_proven_shares != self.shares.len() {
            return false;
        }

        let rows_are_committed = self
            .row_proof
            .row_roots
            .iter()
            .zip(&self.row_proof.proofs)
            .all(|(root, proof)| proof.verify(&root.iter().collect::<Vec<u8>>(), data_root));
        if !rows_are_committed {
            return false;
        }

        let mut cursor = 0;
        for (proof, root) in self.share_proofs.iter().zip(&self.row_proof.row_roots) {
            let shares = &self.shares[cursor..cursor + proof.len()];
            if !proof.verify_inclusion(root, self.namespace, shares) {
                return false;
            }
            cursor += proof.len();
        }
        true
    }

    /// Returns if the proof covers exactly the shares `range` of the original data
    /// square.
    ///
    /// The width of the original square is derived from the row root proofs, which
    /// are proofs into a tree of `4 * width` leaves.
    #[must_use]
    pub fn covers(&self, range: ShareRange) -> bool {
        if range.is_empty() || range.len() != self.shares.len() {
            return false;
        }
        let Some(total) = self.row_proof.proofs.first().map(MerkleInclusionProof::total) else {
            return false;
        };
        if total == 0 || total % 4 != 0 {
            return false;
        }
        let Ok(width) = usize::try_from(total / 4) else {
            return false;
        };

        let start_row = range.start() / width;
        let end_row = (range.end() - 1) / width;
        if usize::try_from(self.row_proof.start_row).ok() != Some(start_row)
            || usize::try_from(self.row_proof.end_row).ok() != Some(end_row)
        {
            return false;
        }
        let rows_are_consecutive = self
            .row_proof
            .proofs
            .iter()
            .zip(start_row..)
            .all(|(proof, row)| {
                proof.total() == total && usize::try_from(proof.index()).ok() == Some(row)
            });
        if !rows_are_consecutive {
            return false;
        }

        let (Some(first), Some(last)) = (self.share_proofs.first(), self.share_proofs.last())
        else {
            return false;
        };
        first.start == range.start() % width
            && last.end == (range.end() - 1) % width + 1
            && self.share_proofs.iter().all(|proof| proof.end <= width)
    }
}

fn range_proof_from_raw(row: usize, raw: NmtProof) -> Result<RangeProof, ShareProofError> {
    let NmtProof {
        start,
        end,
        nodes,
        ..
    } = raw;
    let start = usize::try_from(start).map_err(|_| ShareProofError::negative_bound(row))?;
    let end = usize::try_from(end).map_err(|_| ShareProofError::negative_bound(row))?;
    let nodes = nodes
        .iter()
        .map(|node| RowRoot::try_from(&node[..]))
        .collect::<Result<_, _>>()
        .map_err(|source| ShareProofError::nmt_node(row, source))?;
    Ok(RangeProof {
        start,
        end,
        nodes,
    })
}
