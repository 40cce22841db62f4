use serde::Deserialize;
use tendermint::merkle::Proof as MerkleProof;
use tendermint_proto::serializers::bytes::{
    base64string,
    vec_base64string,
};

use crate::{
    object_params,
    Client,
    Error,
};

/// A proof that a range of shares is committed to by a block's data root.
///
/// The shares may span several rows of the original data square. Every row gets
/// a namespaced merkle range proof into its row root, and every row root gets a
/// merkle proof into the data root.
#[derive(Clone, Debug, Deserialize)]
pub struct ShareProof {
    /// The raw shares, each 512 bytes.
    #[serde(default, with = "vec_base64string")]
    pub data: Vec<Vec<u8>>,
    /// One range proof per row.
    #[serde(default)]
    pub share_proofs: Vec<NmtProof>,
    #[serde(with = "base64string")]
    pub namespace_id: Vec<u8>,
    pub row_proof: RowProof,
    #[serde(default)]
    pub namespace_version: u32,
}

/// A range proof into a namespaced merkle tree.
#[derive(Clone, Debug, Deserialize)]
pub struct NmtProof {
    #[serde(default)]
    pub start: i32,
    #[serde(default)]
    pub end: i32,
    #[serde(default, with = "vec_base64string")]
    pub nodes: Vec<Vec<u8>>,
    #[serde(default, with = "base64string")]
    pub leaf_hash: Vec<u8>,
}

/// Proofs of the row roots `[start_row, end_row]` into the data root.
#[derive(Clone, Debug, Deserialize)]
pub struct RowProof {
    #[serde(default)]
    pub row_roots: Vec<HexBytes>,
    #[serde(default)]
    pub proofs: Vec<MerkleProof>,
    #[serde(default)]
    pub start_row: u32,
    #[serde(default)]
    pub end_row: u32,
}

/// A byte string transmitted as hex, like celestia-core's `HexBytes`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HexBytes(#[serde(with = "hex::serde")] pub Vec<u8>);

/// The response to the `data_root_inclusion_proof` RPC.
#[derive(Clone, Debug, Deserialize)]
pub struct DataRootInclusionProofResponse {
    pub proof: MerkleProof,
}

impl Client {
    /// Issue a `prove_shares` JSON RPC for the shares `[start_share, end_share)` of
    /// the block at `height`.
    ///
    /// # Errors
    /// Returns an error if the JSON RPC was not successful, or if the
    /// response could not be deserialized into a [`ShareProof`].
    pub async fn prove_shares(
        &self,
        height: u64,
        start_share: u64,
        end_share: u64,
    ) -> Result<ShareProof, Error> {
        const RPC_NAME: &str = "prove_shares";
        let params = object_params(
            RPC_NAME,
            [
                ("height", height.to_string().into()),
                ("startShare", start_share.to_string().into()),
                ("endShare", end_share.to_string().into()),
            ],
        )?;
        self.request(RPC_NAME, params, "ShareProof").await
    }

    /// Issue a `data_root_inclusion_proof` JSON RPC, requesting a proof that the
    /// data root of the block at `height` is part of the data commitment over the
    /// blocks `[start, end)`.
    ///
    /// # Errors
    /// Returns an error if the JSON RPC was not successful, or if the
    /// response could not be deserialized into a [`DataRootInclusionProofResponse`].
    pub async fn data_root_inclusion_proof(
        &self,
        height: u64,
        start: u64,
        end: u64,
    ) -> Result<DataRootInclusionProofResponse, Error> {
        const RPC_NAME: &str = "data_root_inclusion_proof";
        let params = object_params(
            RPC_NAME,
            [
                ("height", height.to_string().into()),
                ("start", start.to_string().into()),
                ("end", end.to_string().into()),
            ],
        )?;
        self.request(RPC_NAME, params, "DataRootInclusionProofResponse")
            .await
    }
}
