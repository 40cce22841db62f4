//! The verification pipeline.
//!
//! [`Verifier::run`] executes four stages strictly in order, each consuming the
//! output of the one before:
//!
//! 1. [`Verifier::locate_blob`] resolves the transaction hash to a block and the
//!    shares of the blob in its data square;
//! 2. [`Verifier::verify_shares`] proves those shares against the block's data root;
//! 3. [`Verifier::prove_batch`] proves the block's data root tuple against the data
//!    commitment of the configured batch;
//! 4. [`Verifier::verify_attestation`] asks the Blobstream contract to check that
//!    proof against the root it stored for the batch's nonce.
//!
//! The first failure halts the pipeline. Nothing is retried.
use blobstream_contracts::IDAOracle;
use ethers::providers::{
    Http,
    Provider,
};
use tendermint::Hash;
use tracing::{
    info,
    instrument,
    warn,
};

use crate::{
    attestation::{
        self,
        DataRootTuple,
    },
    batch::{
        Batch,
        DataRootInclusionProof,
    },
    locate::{
        Located,
        MalformedBlock,
        TxHash,
    },
    share_proof::ShareProof,
    square::Layout,
    Config,
};

mod builder;
mod error;

pub use builder::Builder;
pub use error::{
    Error,
    ErrorKind,
    Stage,
};

/// The output of the third stage.
#[derive(Clone, Debug)]
pub struct BatchProved {
    pub tuple: DataRootTuple,
    pub proof: DataRootInclusionProof,
    /// The root of the data commitment as recomputed from the tuple and the proof.
    pub commitment_root: [u8; 32],
}

/// The successful outcome of the pipeline.
#[derive(Clone, Debug)]
pub struct Attested {
    pub located: Located,
    pub tuple: DataRootTuple,
    pub batch: Batch,
}

/// Verifies that a blob is part of a Celestia block whose data root was attested
/// to by Blobstream.
pub struct Verifier {
    celestia: celestia_client::Client,
    blobstream: IDAOracle<Provider<Http>>,
    tx_hash: String,
    blob_index: usize,
    batch: Batch,
}

impl Verifier {
    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Constructs a verifier from the service configuration.
    ///
    /// # Errors
    /// Returns an error if the batch in the configuration is empty, or if either
    /// client could not be constructed.
    pub fn from_config(cfg: &Config) -> eyre::Result<Self> {
        Builder::from_config(cfg)?.build()
    }

    /// Runs all stages in order, stopping at the first failure.
    ///
    /// The verifier and the clients it holds are dropped when this returns.
    ///
    /// # Errors
    /// Returns the error of the first stage that failed.
    #[instrument(
        skip_all,
        fields(tx_hash = %self.tx_hash, blob_index = self.blob_index, batch = %self.batch),
    )]
    pub async fn run(self) -> Result<Attested, Error> {
        let located = self.locate_blob().await?;
        info!(
            state = "located",
            height = located.height,
            tx_index = located.tx_index,
            namespace = %hex::encode(located.namespace.as_bytes()),
            share_range = %located.share_range,
            "located blob in data square",
        );
        self.verify_shares(&located).await?;
        info!(state = "share_verified", "shares are committed to by the data root");
        let batch_proved = self.prove_batch(&located).await?;
        info!(
            state = "batch_proved",
            "data root tuple is included in the data commitment"
        );
        let attested = self.verify_attestation(located, &batch_proved).await?;
        info!(state = "attested", "Blobstream attests to the data commitment");
        Ok(attested)
    }

    /// Resolves the configured transaction hash to the location of the configured
    /// blob.
    ///
    /// # Errors
    /// Fails with [`ErrorKind::Decode`] if the hash is malformed, with
    /// [`ErrorKind::NotFound`] if the transaction or its block could not be fetched,
    /// with [`ErrorKind::InvalidBlock`] if the block is inconsistent with the
    /// transaction or is not a valid Celestia block, and with [`ErrorKind::Range`]
    /// if the transaction does not carry the blob.
    #[instrument(skip_all, err)]
    pub async fn locate_blob(&self) -> Result<Located, Error> {
        self.locate_blob_inner()
            .await
            .map_err(|kind| Error::new(Stage::Locate, kind))
    }

    async fn locate_blob_inner(&self) -> Result<Located, ErrorKind> {
        let tx_hash: TxHash = self
            .tx_hash
            .parse()
            .map_err(|e| ErrorKind::decode(&self.tx_hash, e))?;
        let tx = self
            .celestia
            .tx(tx_hash.get(), true)
            .await
            .map_err(|e| ErrorKind::not_found(format!("transaction `{tx_hash}`"), e))?;
        let height = tx.height.value();
        let block = self
            .celestia
            .block(height)
            .await
            .map_err(|e| ErrorKind::not_found(format!("block at height `{height}`"), e))?
            .block;

        if block.header.height.value() != height {
            return Err(ErrorKind::invalid_block(
                height,
                MalformedBlock::Height {
                    expected: height,
                    actual: block.header.height.value(),
                },
            ));
        }
        let Some(Hash::Sha256(data_root)) = block.header.data_hash else {
            return Err(ErrorKind::invalid_block(
                height,
                MalformedBlock::MissingDataHash,
            ));
        };
        let tx_index = usize::try_from(tx.index)
            .ok()
            .filter(|index| *index < block.data.len())
            .ok_or_else(|| {
                ErrorKind::invalid_block(
                    height,
                    MalformedBlock::TxIndex {
                        index: tx.index,
                        num_txs: block.data.len(),
                    },
                )
            })?;
        if block.data[tx_index] != tx.tx {
            return Err(ErrorKind::invalid_block(
                height,
                MalformedBlock::TxMismatch(tx_index),
            ));
        }

        let layout = Layout::from_txs(&block.data, block.header.version.app)
            .map_err(|e| ErrorKind::invalid_block(height, e))?;
        let share_range = layout
            .blob_share_range(tx_index, self.blob_index)
            .map_err(|e| {
                if e.is_out_of_range() {
                    ErrorKind::range(height, tx_index, self.blob_index, e)
                } else {
                    ErrorKind::invalid_block(height, e)
                }
            })?;
        let namespace = layout
            .blob_namespace(tx_index, self.blob_index)
            .ok_or_else(|| {
                ErrorKind::range(
                    height,
                    tx_index,
                    self.blob_index,
                    "blob has no namespace in the square layout",
                )
            })?;

        Ok(Located {
            tx_hash,
            height,
            tx_index,
            blob_index: self.blob_index,
            namespace,
            share_range,
            data_root,
        })
    }

    /// Fetches the proof of the located shares and checks it against the block's
    /// data root.
    ///
    /// # Errors
    /// Fails with [`ErrorKind::ProofFetch`] if the proof could not be fetched or is
    /// malformed, and with [`ErrorKind::ProofInvalid`] if it does not prove exactly
    /// the located shares under the blob's namespace.
    #[instrument(
        skip_all,
        fields(height = located.height, share_range = %located.share_range),
        err,
    )]
    pub async fn verify_shares(&self, located: &Located) -> Result<(), Error> {
        self.verify_shares_inner(located)
            .await
            .map_err(|kind| Error::new(Stage::VerifyShares, kind))
    }

    async fn verify_shares_inner(&self, located: &Located) -> Result<(), ErrorKind> {
        let Located {
            height,
            share_range,
            data_root,
            namespace,
            ..
        } = *located;
        let raw = self
            .celestia
            .prove_shares(
                height,
                share_range.start() as u64,
                share_range.end() as u64,
            )
            .await
            .map_err(|e| ErrorKind::proof_fetch(height, e))?;
        let proof = ShareProof::try_from_raw(raw).map_err(|e| ErrorKind::proof_fetch(height, e))?;

        if !proof.verify(data_root) {
            return Err(ErrorKind::proof_invalid(
                height,
                share_range,
                "shares are not committed to by the block's data root",
            ));
        }
        if !proof.covers(share_range) {
            return Err(ErrorKind::proof_invalid(
                height,
                share_range,
                "proof does not cover exactly the blob's shares",
            ));
        }
        if proof.namespace() != namespace {
            return Err(ErrorKind::proof_invalid(
                height,
                share_range,
                "shares are proven under a namespace other than the blob's",
            ));
        }
        Ok(())
    }

    /// Fetches the proof that the block's data root tuple is part of the data
    /// commitment of the configured batch.
    ///
    /// # Errors
    /// Fails with [`ErrorKind::ProofFetch`] if the block is outside the batch, if
    /// the proof could not be fetched, or if it is not a proof for the block's
    /// position in the batch.
    #[instrument(skip_all, fields(height = located.height, batch = %self.batch), err)]
    pub async fn prove_batch(&self, located: &Located) -> Result<BatchProved, Error> {
        self.prove_batch_inner(located)
            .await
            .map_err(|kind| Error::new(Stage::ProveBatch, kind))
    }

    async fn prove_batch_inner(&self, located: &Located) -> Result<BatchProved, ErrorKind> {
        let height = located.height;
        if !self.batch.contains(height) {
            return Err(ErrorKind::proof_fetch(
                height,
                format!("height `{height}` is outside of batch `{}`", self.batch),
            ));
        }
        let raw = self
            .celestia
            .data_root_inclusion_proof(height, self.batch.start(), self.batch.end())
            .await
            .map_err(|e| ErrorKind::proof_fetch(height, e))?
            .proof;
        let proof = DataRootInclusionProof::try_from_raw(raw, height, self.batch)
            .map_err(|e| ErrorKind::proof_fetch(height, e))?;

        let tuple = DataRootTuple::new(height, located.data_root);
        let commitment_root = proof.compute_root(&tuple.encode()).ok_or_else(|| {
            ErrorKind::proof_fetch(height, "proof does not fit the data commitment")
        })?;
        info!(
            commitment_root = %hex::encode(commitment_root),
            "recomputed data commitment root; it must match the root stored on chain",
        );
        Ok(BatchProved {
            tuple,
            proof,
            commitment_root,
        })
    }

    /// Checks the data root tuple and its proof against the data commitment the
    /// Blobstream contract stored for the batch's nonce.
    ///
    /// # Errors
    /// Fails with [`ErrorKind::ContractCall`] if calling the contract failed, and
    /// with [`ErrorKind::AttestationMismatch`] if the contract rejected the proof.
    #[instrument(skip_all, fields(nonce = self.batch.nonce()), err)]
    pub async fn verify_attestation(
        &self,
        located: Located,
        batch_proved: &BatchProved,
    ) -> Result<Attested, Error> {
        self.verify_attestation_inner(located, batch_proved)
            .await
            .map_err(|kind| Error::new(Stage::VerifyAttestation, kind))
    }

    async fn verify_attestation_inner(
        &self,
        located: Located,
        batch_proved: &BatchProved,
    ) -> Result<Attested, ErrorKind> {
        let BatchProved {
            tuple,
            proof,
            commitment_root,
        } = batch_proved;
        let valid = self
            .blobstream
            .verify_attestation(
                self.batch.nonce().into(),
                tuple.to_contract(),
                attestation::reencode(proof),
            )
            .call()
            .await
            .map_err(|e| ErrorKind::contract_call(self.batch, e))?;
        if !valid {
            warn!(
                commitment_root = %hex::encode(commitment_root),
                "contract rejected the data root tuple; the root stored for the nonce differs \
                 from the recomputed data commitment root",
            );
            return Err(ErrorKind::attestation_mismatch(tuple.height(), self.batch));
        }
        Ok(Attested {
            located,
            tuple: *tuple,
            batch: self.batch,
        })
    }
}
