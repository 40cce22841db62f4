use figment::{
    providers::Env,
    Figment,
};
use serde::{
    Deserialize,
    Serialize,
};

/// The prefix of all environment variables read into [`Config`].
pub const ENV_PREFIX: &str = "ASTRIA_BLOBSTREAM_VERIFIER_";

/// The configuration of a verification run.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Filter directives for the emitted logs.
    pub log: String,
    /// Write human readable logs instead of JSON.
    pub pretty_print: bool,
    /// The RPC endpoint of a celestia-core consensus node.
    pub celestia_rpc_endpoint: String,
    /// The JSON-RPC endpoint of the chain the Blobstream contract is deployed on.
    pub evm_rpc_endpoint: String,
    /// The address of the Blobstream contract.
    pub blobstream_contract_address: String,
    /// The hex encoded hash of the transaction that paid for the blob.
    pub tx_hash: String,
    /// The index of the blob among the blobs paid for by the transaction.
    pub blob_index: u64,
    /// The first block of the data commitment.
    pub data_commitment_start_block: u64,
    /// The block after the last block of the data commitment.
    pub data_commitment_end_block: u64,
    /// The nonce under which Blobstream stored the data commitment.
    pub data_commitment_nonce: u64,
    /// The time in milliseconds after which a request to the celestia-core node is
    /// abandoned.
    pub request_timeout_ms: u64,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// `RUST_LOG` is used for the log filter if the prefixed variable is unset.
    ///
    /// # Errors
    /// Returns an error if a variable is missing, malformed, or not known.
    pub fn get() -> Result<Self, figment::Error> {
        Self::get_with_prefix(ENV_PREFIX)
    }

    fn get_with_prefix(prefix: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::prefixed(prefix))
            .extract()
    }
}
