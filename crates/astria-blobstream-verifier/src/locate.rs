//! Resolving a transaction hash to the shares of one of its blobs.
use std::{
    fmt,
    str::FromStr,
};

use celestia_types::nmt::Namespace;

use crate::square::ShareRange;

/// The 32 byte hash of a Celestia transaction.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TxHash([u8; 32]);

impl TxHash {
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn get(self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TxHash").field(&format_args!("{self}")).finish()
    }
}

impl FromStr for TxHash {
    type Err = ParseTxHashError;

    /// Parses a hex encoded hash, optionally prefixed by `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(ParseTxHashError::hex)?;
        let bytes = <[u8; 32]>::try_from(bytes)
            .map_err(|bytes| ParseTxHashError::length(bytes.len()))?;
        Ok(Self(bytes))
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ParseTxHashError(ParseTxHashErrorKind);

impl ParseTxHashError {
    fn hex(source: hex::FromHexError) -> Self {
        Self(ParseTxHashErrorKind::Hex {
            source,
        })
    }

    fn length(actual: usize) -> Self {
        Self(ParseTxHashErrorKind::Length {
            actual,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum ParseTxHashErrorKind {
    #[error("input is not valid hex")]
    Hex { source: hex::FromHexError },
    #[error("expected 32 bytes, got `{actual}`")]
    Length { actual: usize },
}

/// The output of the first stage: the blob's position in its block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Located {
    pub tx_hash: TxHash,
    pub height: u64,
    pub tx_index: usize,
    pub blob_index: usize,
    pub namespace: Namespace,
    pub share_range: ShareRange,
    pub data_root: [u8; 32],
}

/// Inconsistencies between a block and the transaction that was looked up in it.
#[derive(Debug, thiserror::Error)]
pub(crate) enum MalformedBlock {
    #[error("block reports height `{actual}`, expected `{expected}`")]
    Height { expected: u64, actual: u64 },
    #[error("block header carries no data hash")]
    MissingDataHash,
    #[error("transaction index `{index}` is out of range for a block of `{num_txs}` transactions")]
    TxIndex { index: u32, num_txs: usize },
    #[error("transaction at index `{0}` differs from the transaction returned for the hash")]
    TxMismatch(usize),
}
