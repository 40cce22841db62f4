use std::fmt;

use crate::{
    batch::Batch,
    square::ShareRange,
};

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The stages of the verification pipeline, in the order they are run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Locating the blob's shares in the block's data square.
    Locate,
    /// Proving the blob's shares against the block's data root.
    VerifyShares,
    /// Proving the block's data root against the data commitment.
    ProveBatch,
    /// Checking the data commitment proof against the Blobstream contract.
    VerifyAttestation,
}

impl Stage {
    /// The 1-based position of the stage in the pipeline.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Locate => 1,
            Self::VerifyShares => 2,
            Self::ProveBatch => 3,
            Self::VerifyAttestation => 4,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locate => "locate",
            Self::VerifyShares => "verify_shares",
            Self::ProveBatch => "prove_batch",
            Self::VerifyAttestation => "verify_attestation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure of the verification pipeline, attributed to the stage it occurred in.
#[derive(Debug, thiserror::Error)]
#[error("verification failed in stage {} (`{stage}`)", .stage.number())]
pub struct Error {
    stage: Stage,
    #[source]
    kind: ErrorKind,
}

impl Error {
    pub(super) fn new(stage: Stage, kind: ErrorKind) -> Self {
        Self {
            stage,
            kind,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// The reasons the verification pipeline can fail for.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("failed decoding `{input}` as a hex encoded transaction hash")]
    Decode { input: String, source: BoxedError },
    #[error("{object} {}", fetch_outcome(.reported_missing))]
    NotFound {
        object: String,
        reported_missing: bool,
        source: BoxedError,
    },
    #[error("blob `{blob_index}` of transaction `{tx_index}` in block `{height}` does not exist")]
    Range {
        height: u64,
        tx_index: usize,
        blob_index: usize,
        source: BoxedError,
    },
    #[error("block `{height}` returned by the node is malformed")]
    InvalidBlock { height: u64, source: BoxedError },
    #[error("failed fetching or decoding a proof for block `{height}`")]
    ProofFetch { height: u64, source: BoxedError },
    #[error("proof for shares `{range}` of block `{height}` is invalid: {reason}")]
    ProofInvalid {
        height: u64,
        range: ShareRange,
        reason: &'static str,
    },
    #[error("calling the Blobstream contract for batch `{batch}` failed")]
    ContractCall { batch: Batch, source: BoxedError },
    #[error(
        "the Blobstream contract rejected the data root tuple of block `{height}` for batch \
         `{batch}`"
    )]
    AttestationMismatch { height: u64, batch: Batch },
}

impl ErrorKind {
    pub(super) fn decode<T: Into<BoxedError>>(input: &str, source: T) -> Self {
        Self::Decode {
            input: input.to_string(),
            source: source.into(),
        }
    }

    pub(super) fn not_found(object: String, source: celestia_client::Error) -> Self {
        Self::NotFound {
            object,
            reported_missing: source.is_not_found(),
            source: source.into(),
        }
    }

    pub(super) fn range<T: Into<BoxedError>>(
        height: u64,
        tx_index: usize,
        blob_index: usize,
        source: T,
    ) -> Self {
        Self::Range {
            height,
            tx_index,
            blob_index,
            source: source.into(),
        }
    }

    pub(super) fn invalid_block<T: Into<BoxedError>>(height: u64, source: T) -> Self {
        Self::InvalidBlock {
            height,
            source: source.into(),
        }
    }

    pub(super) fn proof_fetch<T: Into<BoxedError>>(height: u64, source: T) -> Self {
        Self::ProofFetch {
            height,
            source: source.into(),
        }
    }

    pub(super) fn proof_invalid(height: u64, range: ShareRange, reason: &'static str) -> Self {
        Self::ProofInvalid {
            height,
            range,
            reason,
        }
    }

    pub(super) fn contract_call<T: Into<BoxedError>>(batch: Batch, source: T) -> Self {
        Self::ContractCall {
            batch,
            source: source.into(),
        }
    }

    pub(super) fn attestation_mismatch(height: u64, batch: Batch) -> Self {
        Self::AttestationMismatch {
            height,
            batch,
        }
    }

    /// A short, stable name of the failure for logs and exit reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode_error",
            Self::NotFound { .. } => "not_found",
            Self::Range { .. } => "range_error",
            Self::InvalidBlock { .. } => "invalid_block",
            Self::ProofFetch { .. } => "proof_fetch_error",
            Self::ProofInvalid { .. } => "proof_invalid",
            Self::ContractCall { .. } => "contract_call_error",
            Self::AttestationMismatch { .. } => "attestation_mismatch",
        }
    }
}

fn fetch_outcome(reported_missing: &bool) -> &'static str {
    if *reported_missing {
        "does not exist"
    } else {
        "could not be fetched"
    }
}
