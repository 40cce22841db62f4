use std::time::Duration;

use eyre::WrapErr as _;

use super::Verifier;
use crate::{
    batch::Batch,
    Config,
};

/// Constructs a [`Verifier`].
///
/// All options except for the blob index and the request timeout are required.
#[derive(Debug, Default)]
pub struct Builder {
    celestia_rpc_endpoint: Option<String>,
    evm_rpc_endpoint: Option<String>,
    blobstream_contract_address: Option<String>,
    tx_hash: Option<String>,
    blob_index: usize,
    batch: Option<Batch>,
    request_timeout: Option<Duration>,
}

impl Builder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_config(cfg: &Config) -> eyre::Result<Self> {
        let batch = Batch::new(
            cfg.data_commitment_start_block,
            cfg.data_commitment_end_block,
            cfg.data_commitment_nonce,
        )
        .wrap_err("configured data commitment is invalid")?;
        let blob_index = usize::try_from(cfg.blob_index)
            .wrap_err("configured blob index does not fit into the address space")?;
        Ok(Self::new()
            .celestia_rpc_endpoint(&cfg.celestia_rpc_endpoint)
            .evm_rpc_endpoint(&cfg.evm_rpc_endpoint)
            .blobstream_contract_address(&cfg.blobstream_contract_address)
            .tx_hash(&cfg.tx_hash)
            .blob_index(blob_index)
            .batch(batch)
            .request_timeout(Duration::from_millis(cfg.request_timeout_ms)))
    }

    #[must_use]
    pub fn celestia_rpc_endpoint(self, celestia_rpc_endpoint: &str) -> Self {
        Self {
            celestia_rpc_endpoint: Some(celestia_rpc_endpoint.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn evm_rpc_endpoint(self, evm_rpc_endpoint: &str) -> Self {
        Self {
            evm_rpc_endpoint: Some(evm_rpc_endpoint.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn blobstream_contract_address(self, blobstream_contract_address: &str) -> Self {
        Self {
            blobstream_contract_address: Some(blobstream_contract_address.to_string()),
            ..self
        }
    }

    /// Sets the hash of the transaction carrying the blob.
    ///
    /// The hash is only decoded when the pipeline runs, so that a malformed hash is
    /// reported as a failure of its first stage.
    #[must_use]
    pub fn tx_hash(self, tx_hash: &str) -> Self {
        Self {
            tx_hash: Some(tx_hash.to_string()),
            ..self
        }
    }

    /// Sets the index of the blob among the blobs of the transaction. Defaults to 0.
    #[must_use]
    pub fn blob_index(self, blob_index: usize) -> Self {
        Self {
            blob_index,
            ..self
        }
    }

    #[must_use]
    pub fn batch(self, batch: Batch) -> Self {
        Self {
            batch: Some(batch),
            ..self
        }
    }

    /// Sets the time after which a request to the Celestia node is abandoned.
    #[must_use]
    pub fn request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout: Some(request_timeout),
            ..self
        }
    }

    /// Constructs the verifier and the clients it holds.
    ///
    /// No requests are made.
    ///
    /// # Errors
    /// Returns an error if a required option is not set, or if either client could
    /// not be constructed.
    pub fn build(self) -> eyre::Result<Verifier> {
        let Self {
            celestia_rpc_endpoint,
            evm_rpc_endpoint,
            blobstream_contract_address,
            tx_hash,
            blob_index,
            batch,
            request_timeout,
        } = self;
        let celestia_rpc_endpoint =
            celestia_rpc_endpoint.ok_or_else(|| eyre::eyre!("celestia RPC endpoint not set"))?;
        let evm_rpc_endpoint =
            evm_rpc_endpoint.ok_or_else(|| eyre::eyre!("EVM RPC endpoint not set"))?;
        let blobstream_contract_address = blobstream_contract_address
            .ok_or_else(|| eyre::eyre!("Blobstream contract address not set"))?;
        let tx_hash = tx_hash.ok_or_else(|| eyre::eyre!("transaction hash not set"))?;
        let batch = batch.ok_or_else(|| eyre::eyre!("data commitment batch not set"))?;

        let mut celestia = celestia_client::Client::builder().endpoint(&celestia_rpc_endpoint);
        if let Some(request_timeout) = request_timeout {
            celestia = celestia.request_timeout(request_timeout);
        }
        let celestia = celestia
            .build()
            .wrap_err("failed constructing celestia RPC client")?;

        let blobstream = blobstream_contracts::Builder::new()
            .provider_url(&evm_rpc_endpoint)
            .contract_address(&blobstream_contract_address)
            .build()
            .wrap_err("failed constructing Blobstream contract client")?;

        Ok(Verifier {
            celestia,
            blobstream,
            tx_hash,
            blob_index,
            batch,
        })
    }
}
