//! The final stage's view of Blobstream: data root tuples and the proof format of
//! the contract.
use std::fmt;

use blobstream_contracts::{
    encode_data_root_tuple,
    BinaryMerkleProof,
};

use crate::batch::DataRootInclusionProof;

/// The leaf committed to by Blobstream for every block of a batch.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DataRootTuple {
    height: u64,
    data_root: [u8; 32],
}

impl DataRootTuple {
    #[must_use]
    pub const fn new(height: u64, data_root: [u8; 32]) -> Self {
        Self {
            height,
            data_root,
        }
    }

    #[must_use]
    pub const fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub const fn data_root(&self) -> [u8; 32] {
        self.data_root
    }

    #[must_use]
    pub fn to_contract(&self) -> blobstream_contracts::DataRootTuple {
        blobstream_contracts::DataRootTuple {
            height: self.height.into(),
            data_root: self.data_root,
        }
    }

    /// The ABI encoding of the tuple, which is the leaf of the data commitment.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_data_root_tuple(&self.to_contract())
    }
}

impl fmt::Debug for DataRootTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataRootTuple")
            .field("height", &self.height)
            .field("data_root", &hex::encode(self.data_root))
            .finish()
    }
}

/// Re-encodes a data root inclusion proof as the proof type of the Blobstream
/// contract.
///
/// Side nodes stay in leaf-to-root order. Key and leaf count are carried over as is.
#[must_use]
pub fn reencode(proof: &DataRootInclusionProof) -> BinaryMerkleProof {
    BinaryMerkleProof {
        side_nodes: proof.aunts().to_vec(),
        key: proof.index().into(),
        num_leaves: proof.total().into(),
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use tendermint::{
        merkle::Proof as MerkleProof,
        Hash,
    };

    use super::*;
    use crate::batch::Batch;

    fn tuples(batch: Batch) -> Vec<DataRootTuple> {
        (batch.start()..batch.end())
            .map(|height| DataRootTuple::new(height, [u8::try_from(height % 256).unwrap(); 32]))
            .collect()
    }

    #[test]
    fn tuple_is_encoded_as_height_followed_by_data_root() {
        let tuple = DataRootTuple::new(
            258,
            hex!("3d96b7d238e7e0456f6af8e7cdf0a67bd6cf9c2089ecb559c659dcaa1f880353"),
        );
        let encoded = tuple.encode();
        assert_eq!(64, encoded.len());
        assert_eq!(
            hex!("0000000000000000000000000000000000000000000000000000000000000102"),
            encoded[..32]
        );
        assert_eq!(tuple.data_root(), encoded[32..]);
    }

    #[test]
    fn reencoding_preserves_side_node_order_key_and_leaf_count() {
        let batch = Batch::new(40, 47, 1).unwrap();
        let tuples = tuples(batch);
        let tree = merkle::Tree::from_leaves(tuples.iter().map(DataRootTuple::encode));
        let audit = tree.construct_proof(2).unwrap();
        let proof = DataRootInclusionProof::try_from_raw(
            MerkleProof {
                total: 7,
                index: 2,
                leaf_hash: Hash::Sha256(merkle::hash_leaf(&tuples[2].encode())),
                aunts: audit
                    .audit_path()
                    .iter()
                    .map(|aunt| Hash::Sha256(*aunt))
                    .collect(),
            },
            42,
            batch,
        )
        .unwrap();
        assert_eq!(Some(tree.root()), proof.compute_root(&tuples[2].encode()));

        let binary = reencode(&proof);
        assert_eq!(proof.aunts(), binary.side_nodes.as_slice());
        assert_eq!(audit.audit_path(), binary.side_nodes.as_slice());
        assert_eq!(2u64, binary.key.as_u64());
        assert_eq!(7u64, binary.num_leaves.as_u64());
    }

    #[test]
    fn proof_of_single_block_batch_has_no_side_nodes() {
        let batch = Batch::new(40, 41, 1).unwrap();
        let proof = DataRootInclusionProof::try_from_raw(
            MerkleProof {
                total: 1,
                index: 0,
                leaf_hash: Hash::None,
                aunts: vec![],
            },
            40,
            batch,
        )
        .unwrap();
        let binary = reencode(&proof);
        assert!(binary.side_nodes.is_empty());
        assert!(binary.key.is_zero());
        assert_eq!(1u64, binary.num_leaves.as_u64());

        let tuple = tuples(batch)[0];
        assert_eq!(
            Some(merkle::hash_leaf(&tuple.encode())),
            proof.compute_root(&tuple.encode())
        );
    }
}
