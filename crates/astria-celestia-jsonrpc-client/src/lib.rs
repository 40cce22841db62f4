//! A client for the RPC interface of a celestia-core consensus node.
//!
//! Only the RPCs needed to locate a blob and to fetch the proofs tying it to a
//! Blobstream attestation are implemented:
//!
//! + [`Client::tx`]
//! + [`Client::block`]
//! + [`Client::prove_shares`]
//! + [`Client::data_root_inclusion_proof`]
//!
//! `tx` and `block` are standard CometBFT endpoints and go through
//! [`tendermint_rpc`]. The proof endpoints only exist on celestia-core and are
//! issued as plain JSON-RPC calls.
//!
//! Responses are returned in their wire form. Validating them is left to the
//! caller.
use std::time::Duration;

use ::serde::de::DeserializeOwned;
use jsonrpsee::core::{
    client::ClientT as _,
    params::ObjectParams,
    ClientError,
};
pub use tendermint;
use tendermint_rpc::{
    client::CompatMode,
    HttpClient,
};
pub use tendermint_rpc;

mod cometbft;
pub mod proof;

pub use proof::{
    DataRootInclusionProofResponse,
    ShareProof,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct DeserializationError {
    pub(crate) source: serde_json::Error,
    pub(crate) rpc: &'static str,
    pub(crate) deser_target: &'static str,
    pub(crate) raw_json: Box<serde_json::value::RawValue>,
}

impl DeserializationError {
    #[must_use]
    pub fn raw_json(&self) -> &serde_json::value::RawValue {
        &self.raw_json
    }

    #[must_use]
    pub fn source(&self) -> &serde_json::Error {
        &self.source
    }
}

impl std::fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to deserialize response from `{rpc}` as `{deser_target}`; see \
             error.raw_json() for server response",
            rpc = self.rpc,
            deser_target = self.deser_target,
        )
    }
}

impl std::error::Error for DeserializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug)]
pub struct Error {
    inner: ErrorKind,
    rpc: &'static str,
}

impl Error {
    pub(crate) fn cometbft(e: tendermint_rpc::Error, rpc: &'static str) -> Self {
        Self {
            inner: ErrorKind::CometBft(e),
            rpc,
        }
    }

    pub(crate) fn deserialization(e: DeserializationError, rpc: &'static str) -> Self {
        Self {
            inner: ErrorKind::Deserialization(e),
            rpc,
        }
    }

    pub(crate) fn height(e: tendermint::Error, rpc: &'static str) -> Self {
        Self {
            inner: ErrorKind::Height(e),
            rpc,
        }
    }

    pub(crate) fn params(e: serde_json::Error, rpc: &'static str) -> Self {
        Self {
            inner: ErrorKind::Params(e),
            rpc,
        }
    }

    pub(crate) fn rpc(e: ClientError, rpc: &'static str) -> Self {
        Self {
            inner: ErrorKind::Rpc(e),
            rpc,
        }
    }

    /// The name of the RPC that failed.
    #[must_use]
    pub fn rpc_name(&self) -> &'static str {
        self.rpc
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.inner
    }

    /// Returns if the node responded that the requested object does not exist.
    ///
    /// celestia-core reports unknown transactions as `tx (<hash>) not found` and
    /// heights beyond its latest block as `height <h> must be less than or equal to
    /// the current blockchain height <latest>`, both as internal errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        use tendermint_rpc::error::ErrorDetail;
        let (message, data) = match &self.inner {
            ErrorKind::CometBft(error) => {
                let ErrorDetail::Response(detail) = error.detail() else {
                    return false;
                };
                (
                    detail.source.message().to_lowercase(),
                    detail.source.data().map(str::to_lowercase),
                )
            }
            ErrorKind::Rpc(ClientError::Call(error)) => (
                error.message().to_lowercase(),
                error.data().map(|data| data.get().to_lowercase()),
            ),
            _ => return false,
        };
        [Some(message), data].into_iter().flatten().any(|text| {
            text.contains("not found")
                || text.contains("must be less than or equal to the current blockchain height")
        })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` RPC failed", self.rpc)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.source())
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    CometBft(tendermint_rpc::Error),
    Height(tendermint::Error),
    Rpc(ClientError),
    Params(serde_json::Error),
    Deserialization(DeserializationError),
}

impl ErrorKind {
    fn source(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            Self::CometBft(e) => e,
            Self::Height(e) => e,
            Self::Rpc(e) => e,
            Self::Params(e) => e,
            Self::Deserialization(e) => e,
        }
    }
}

/// A celestia-core RPC client.
#[derive(Clone, Debug)]
pub struct Client {
    cometbft: HttpClient,
    jsonrpc: jsonrpsee::http_client::HttpClient,
}

impl Client {
    /// Construct a celestia client using the builder pattern.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends `method` with named `params` and deserializes the result into `T`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: ObjectParams,
        deser_target: &'static str,
    ) -> Result<T, Error> {
        let raw_json: Box<serde_json::value::RawValue> = self
            .jsonrpc
            .request(method, params)
            .await
            .map_err(|e| Error::rpc(e, method))?;
        serde_json::from_str(raw_json.get())
            .map_err(|e| DeserializationError {
                source: e,
                rpc: method,
                deser_target,
                raw_json: raw_json.clone(),
            })
            .map_err(|e| Error::deserialization(e, method))
    }
}

/// Inserts the named parameters into a fresh [`ObjectParams`].
fn object_params<const N: usize>(
    rpc: &'static str,
    named: [(&str, serde_json::Value); N],
) -> Result<ObjectParams, Error> {
    let mut params = ObjectParams::new();
    for (name, value) in named {
        params
            .insert(name, value)
            .map_err(|e| Error::params(e, rpc))?;
    }
    Ok(params)
}

/// Builder for the celestia RPC client.
///
/// Configurable options:
/// + endpoint (required)
/// + request timeout (optional, defaults to 10 seconds)
///
/// Nodes behind an authenticating proxy can be reached by putting the
/// credentials into the endpoint's userinfo.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    endpoint: Option<String>,
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Return a celestia client builder with all fields initialized to `None`.
    fn new() -> Self {
        Self::default()
    }

    /// Consume the celestia client builder, returning a celestia client.
    ///
    /// # Errors
    /// This method will return errors in the following scenarios:
    /// + if the endpoint is not set;
    /// + if the endpoint is not a valid http(s) url;
    /// + if building either of the underlying http clients failed.
    pub fn build(self) -> Result<Client, BuildError> {
        use jsonrpsee::http_client::HttpClientBuilder;
        let Self {
            endpoint,
            request_timeout,
        } = self;
        let Some(endpoint) = endpoint else {
            return Err(BuildError::missing_endpoint());
        };
        let request_timeout = request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let url = endpoint
            .parse::<tendermint_rpc::HttpClientUrl>()
            .map_err(BuildError::cometbft_builder)?;
        let cometbft = HttpClient::builder(url)
            .compat_mode(CompatMode::V0_34)
            .timeout(request_timeout)
            .build()
            .map_err(BuildError::cometbft_builder)?;
        let jsonrpc = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(endpoint)
            .map_err(BuildError::jsonrpsee_builder)?;
        Ok(Client {
            cometbft,
            jsonrpc,
        })
    }

    /// Sets the endpoint that the client will connect to.
    ///
    /// Note that the string must be a valid URI. Otherwise `ClientBuilder::build` will fail.
    #[must_use]
    pub fn endpoint(self, endpoint: &str) -> Self {
        Self {
            endpoint: Some(endpoint.to_string()),
            ..self
        }
    }

    /// Sets the time after which a request is abandoned.
    #[must_use]
    pub fn request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout: Some(request_timeout),
            ..self
        }
    }
}

/// The errors that can occur while configuring the celestia client.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct BuildError(BuildErrorKind);

impl BuildError {
    fn cometbft_builder(source: tendermint_rpc::Error) -> Self {
        Self(BuildErrorKind::CometBftBuilder {
            source,
        })
    }

    fn jsonrpsee_builder(source: ClientError) -> Self {
        Self(BuildErrorKind::JsonRpseeBuilder {
            source,
        })
    }

    fn missing_endpoint() -> Self {
        Self(BuildErrorKind::MissingEndpoint)
    }
}

#[derive(Debug, thiserror::Error)]
enum BuildErrorKind {
    #[error("failed constructing CometBFT http client")]
    CometBftBuilder { source: tendermint_rpc::Error },
    #[error("failed constructing JSON-RPC http client")]
    JsonRpseeBuilder { source: ClientError },
    #[error(
        "missing endpoint; an endpoint must be provided so that the client knows where to connect"
    )]
    MissingEndpoint,
}
