//! Bindings to the Blobstream bridge contract.
//!
//! Blobstream periodically commits to the data roots of a range of Celestia blocks
//! `[start, end)`. Every commitment is identified by a nonce, and is the root of a
//! binary merkle tree whose leaves are the ABI-encoded [`DataRootTuple`]s of the
//! blocks in the range. [`IDAOracle::verify_attestation`] checks a
//! [`BinaryMerkleProof`] of one such tuple against the root stored for a nonce.
//!
//! See the [`IDAOracle` interface](https://github.com/celestiaorg/blobstream-contracts/blob/master/src/DataRootTuple.sol).
use std::{
    str::FromStr as _,
    sync::Arc,
};

use ethers::{
    abi::Token,
    contract::abigen,
    providers::{
        Http,
        JsonRpcClient,
        Provider,
    },
    types::Address,
};

abigen!(
    IDAOracle,
    r#"[
        struct DataRootTuple { uint256 height; bytes32 dataRoot; }
        struct BinaryMerkleProof { bytes32[] sideNodes; uint256 key; uint256 numLeaves; }
        function verifyAttestation(uint256 _tupleRootNonce, DataRootTuple memory _tuple, BinaryMerkleProof memory _proof) external view returns (bool)
    ]"#,
);

/// Returns the ABI encoding `abi.encode(tuple)`, the leaf of a data commitment.
///
/// Both fields of the tuple are static, so the encoding is the 32 byte big endian
/// height followed by the data root.
#[must_use]
pub fn encode_data_root_tuple(tuple: &DataRootTuple) -> Vec<u8> {
    ethers::abi::encode(&[
        Token::Uint(tuple.height),
        Token::FixedBytes(tuple.data_root.to_vec()),
    ])
}

/// Returns a new read-only [`IDAOracle`] contract instance.
pub fn read_only<P: JsonRpcClient>(
    provider: Arc<Provider<P>>,
    contract_address: Address,
) -> IDAOracle<Provider<P>> {
    IDAOracle::new(contract_address, provider)
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct BuildError(BuildErrorKind);

impl BuildError {
    #[must_use]
    fn not_set(field: &'static str) -> Self {
        Self(BuildErrorKind::NotSet {
            field,
        })
    }

    #[must_use]
    fn parse_provider_url<T: Into<Box<dyn std::error::Error + Send + Sync + 'static>>>(
        source: T,
    ) -> Self {
        Self(BuildErrorKind::ParseProviderUrl {
            source: source.into(),
        })
    }

    #[must_use]
    fn parse_contract_address<T: Into<Box<dyn std::error::Error + Send + Sync + 'static>>>(
        address: &str,
        source: T,
    ) -> Self {
        Self(BuildErrorKind::ParseContractAddress {
            address: address.to_string(),
            source: source.into(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum BuildErrorKind {
    #[error("required option `{field}` not set")]
    NotSet { field: &'static str },
    #[error("failed parsing the provided string as the URL of an Ethereum JSON-RPC endpoint")]
    ParseProviderUrl {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("failed parsing `{address}` as a 20 byte hex encoded contract address")]
    ParseContractAddress {
        address: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Constructs an [`IDAOracle`] instance talking to a contract over HTTP.
#[derive(Debug, Default)]
pub struct Builder {
    provider_url: Option<String>,
    contract_address: Option<String>,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URL of the Ethereum JSON-RPC endpoint.
    #[must_use]
    pub fn provider_url(self, provider_url: &str) -> Self {
        Self {
            provider_url: Some(provider_url.to_string()),
            ..self
        }
    }

    /// Sets the address of the Blobstream contract, hex encoded with or without `0x`.
    #[must_use]
    pub fn contract_address(self, contract_address: &str) -> Self {
        Self {
            contract_address: Some(contract_address.to_string()),
            ..self
        }
    }

    /// Builds the contract instance.
    ///
    /// # Errors
    /// Returns an error if a field was not set, if the provider URL is not a valid URL,
    /// or if the contract address is not 20 bytes of hex.
    pub fn build(self) -> Result<IDAOracle<Provider<Http>>, BuildError> {
        let Self {
            provider_url,
            contract_address,
        } = self;
        let Some(provider_url) = provider_url else {
            return Err(BuildError::not_set("provider_url"));
        };
        let Some(contract_address) = contract_address else {
            return Err(BuildError::not_set("contract_address"));
        };
        let provider = Provider::<Http>::try_from(provider_url.as_str())
            .map_err(BuildError::parse_provider_url)?;
        let address = Address::from_str(&contract_address)
            .map_err(|e| BuildError::parse_contract_address(&contract_address, e))?;
        Ok(read_only(Arc::new(provider), address))
    }
}
