use tendermint::{
    block::Height,
    Hash,
};
use tendermint_rpc::{
    endpoint::{
        block,
        tx,
    },
    Client as _,
};

use crate::{
    Client,
    Error,
};

impl Client {
    /// Issue a `tx` RPC, looking up a transaction by its sha256 hash.
    ///
    /// # Errors
    /// Returns an error if the RPC was not successful or its response was malformed.
    pub async fn tx(&self, hash: [u8; 32], prove: bool) -> Result<tx::Response, Error> {
        const RPC_NAME: &str = "tx";
        self.cometbft
            .tx(Hash::Sha256(hash), prove)
            .await
            .map_err(|e| Error::cometbft(e, RPC_NAME))
    }

    /// Issue a `block` RPC for the block at `height`.
    ///
    /// # Errors
    /// Returns an error if `height` does not fit a CometBFT height, or if the RPC
    /// was not successful or its response was malformed.
    pub async fn block(&self, height: u64) -> Result<block::Response, Error> {
        const RPC_NAME: &str = "block";
        let height = Height::try_from(height).map_err(|e| Error::height(e, RPC_NAME))?;
        self.cometbft
            .block(height)
            .await
            .map_err(|e| Error::cometbft(e, RPC_NAME))
    }
}
