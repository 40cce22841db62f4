use std::{
    collections::HashMap,
    sync::LazyLock,
    time::Duration,
};

use astria_blobstream_verifier::{
    attestation::DataRootTuple,
    batch::Batch,
    telemetry,
    Verifier,
};
use base64::{
    engine::general_purpose::STANDARD,
    Engine as _,
};
use blobstream_contracts::VerifyAttestationCall;
use ethers::{
    abi::{
        ParamType,
        Token,
    },
    contract::EthCall as _,
};
use serde_json::json;
use tendermint::{
    block::Height,
    Hash,
};
use tendermint_rpc::{
    endpoint::tx,
    response::Wrapper,
    Id,
};
use wiremock::{
    matchers::{
        body_partial_json,
        method,
    },
    Mock,
    MockServer,
    Request,
    ResponseTemplate,
};

mod square;

pub use square::{
    blob_namespace,
    Block,
    BLOB_SHARES,
};

pub const HEIGHT: u64 = 103;
pub const TX_HASH: [u8; 32] = [0x42; 32];
pub const CONTRACT_ADDRESS: &str = "0x046120E6c6C48C05627FB369756F5f44858950a5";

/// The data commitment containing [`HEIGHT`] that the contract stores.
pub fn batch() -> Batch {
    Batch::new(100, 108, 7).unwrap()
}

static TELEMETRY: LazyLock<()> = LazyLock::new(|| {
    if std::env::var_os("TEST_LOG").is_some() {
        let filter_directives = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        println!("initializing telemetry");
        telemetry::init(&filter_directives, true).unwrap();
    }
});

pub struct TestVerifier {
    pub block: Block,
    pub celestia: MockServer,
    pub ethereum: MockServer,
}

impl TestVerifier {
    pub async fn spawn() -> Self {
        LazyLock::force(&TELEMETRY);
        Self {
            block: Block::new(),
            celestia: MockServer::start().await,
            ethereum: MockServer::start().await,
        }
    }

    /// A verifier for blob `blob_index` of the transaction with hash [`TX_HASH`].
    pub fn verifier(&self, blob_index: usize, batch: Batch) -> Verifier {
        self.verifier_for_tx(&hex::encode(TX_HASH), blob_index, batch)
    }

    pub fn verifier_for_tx(&self, tx_hash: &str, blob_index: usize, batch: Batch) -> Verifier {
        Verifier::builder()
            .celestia_rpc_endpoint(&self.celestia.uri())
            .evm_rpc_endpoint(&self.ethereum.uri())
            .blobstream_contract_address(CONTRACT_ADDRESS)
            .tx_hash(tx_hash)
            .blob_index(blob_index)
            .batch(batch)
            .request_timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    /// Mounts the blob transaction at index 1 of the block at [`HEIGHT`].
    pub async fn mount_tx(&self, expected: u64) {
        mount_cometbft_response(
            &self.celestia,
            "tx",
            tx::Response {
                hash: Hash::Sha256(TX_HASH),
                height: Height::try_from(HEIGHT).unwrap(),
                index: 1,
                tx_result: Default::default(),
                tx: self.block.txs[1].clone(),
                proof: None,
            },
            expected,
        )
        .await;
    }

    pub async fn mount_tx_not_found(&self) {
        mount_celestia_error(
            &self.celestia,
            "tx",
            &format!("tx ({}) not found", hex::encode_upper(TX_HASH)),
        )
        .await;
    }

    pub async fn mount_block(&self, expected: u64) {
        mount_cometbft_response(
            &self.celestia,
            "block",
            self.block.block_response(HEIGHT),
            expected,
        )
        .await;
    }

    pub async fn mount_share_proof(&self, tampered: bool, expected: u64) {
        mount_celestia_result(
            &self.celestia,
            "prove_shares",
            self.block.share_proof_json(BLOB_SHARES, tampered),
            expected,
        )
        .await;
    }

    /// Mounts the proof of [`HEIGHT`]'s data root tuple in `batch`.
    pub async fn mount_data_root_inclusion_proof(&self, batch: Batch, expected: u64) {
        let commitment = self.data_commitment(batch);
        let position = usize::try_from(batch.position(HEIGHT).unwrap()).unwrap();
        let proof = commitment.construct_proof(position).unwrap();
        let leaf = DataRootTuple::new(HEIGHT, self.block.data_root()).encode();
        mount_celestia_result(
            &self.celestia,
            "data_root_inclusion_proof",
            json!({
                "proof": {
                    "total": batch.len().to_string(),
                    "index": position.to_string(),
                    "leaf_hash": STANDARD.encode(merkle::hash_leaf(&leaf)),
                    "aunts": proof
                        .audit_path()
                        .iter()
                        .map(|aunt| STANDARD.encode(aunt))
                        .collect::<Vec<_>>(),
                },
            }),
            expected,
        )
        .await;
    }

    /// Mounts a Blobstream contract that stored the data commitments of `batches`
    /// under their nonces.
    pub async fn mount_blobstream(&self, batches: &[Batch], expected: u64) {
        let roots: HashMap<u64, [u8; 32]> = batches
            .iter()
            .map(|batch| (batch.nonce(), self.data_commitment(*batch).root()))
            .collect();
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_call"})))
            .respond_with(move |request: &Request| verify_attestation(request, &roots))
            .expect(expected)
            .mount(&self.ethereum)
            .await;
    }

    /// The data commitment over the blocks of `batch`. All blocks but the one at
    /// [`HEIGHT`] have made up data roots.
    fn data_commitment(&self, batch: Batch) -> merkle::Tree {
        merkle::Tree::from_leaves((batch.start()..batch.end()).map(|height| {
            let data_root = if height == HEIGHT {
                self.block.data_root()
            } else {
                [u8::try_from(height % 256).unwrap(); 32]
            };
            DataRootTuple::new(height, data_root).encode()
        }))
    }
}

async fn mount_celestia_result(
    server: &MockServer,
    rpc: &str,
    result: serde_json::Value,
    expected: u64,
) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"jsonrpc": "2.0", "method": rpc})))
        .respond_with(move |request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body.get("id"),
                "result": result,
            }))
        })
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_cometbft_response<T: serde::Serialize>(
    server: &MockServer,
    rpc: &str,
    response: T,
    expected: u64,
) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"jsonrpc": "2.0", "method": rpc})))
        .respond_with(ResponseTemplate::new(200).set_body_json(Wrapper::new_with_id(
            Id::uuid_v4(),
            Some(response),
            None,
        )))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_celestia_error(server: &MockServer, rpc: &str, data: &str) {
    let data = data.to_string();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"jsonrpc": "2.0", "method": rpc})))
        .respond_with(move |request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body.get("id"),
                "error": {"code": -32603, "message": "Internal error", "data": data},
            }))
        })
        .expect(1)
        .mount(server)
        .await;
}

/// Answers an `eth_call` of `verifyAttestation` the way the Blobstream contract
/// does: the proof must lead from the tuple to the root stored for the nonce.
fn verify_attestation(request: &Request, roots: &HashMap<u64, [u8; 32]>) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let call = &body["params"][0];
    let input = call
        .get("input")
        .or_else(|| call.get("data"))
        .and_then(serde_json::Value::as_str)
        .expect("eth_call must carry calldata");
    let calldata = hex::decode(input.trim_start_matches("0x")).unwrap();
    assert_eq!(VerifyAttestationCall::selector(), calldata[..4]);

    let tokens = ethers::abi::decode(
        &[
            ParamType::Uint(256),
            ParamType::Tuple(vec![ParamType::Uint(256), ParamType::FixedBytes(32)]),
            ParamType::Tuple(vec![
                ParamType::Array(Box::new(ParamType::FixedBytes(32))),
                ParamType::Uint(256),
                ParamType::Uint(256),
            ]),
        ],
        &calldata[4..],
    )
    .unwrap();
    let [Token::Uint(nonce), Token::Tuple(tuple), Token::Tuple(proof)] = &tokens[..] else {
        panic!("unexpected calldata layout: {tokens:?}");
    };
    let [Token::Uint(height), Token::FixedBytes(data_root)] = &tuple[..] else {
        panic!("unexpected data root tuple layout: {tuple:?}");
    };
    let [Token::Array(side_nodes), Token::Uint(key), Token::Uint(num_leaves)] = &proof[..] else {
        panic!("unexpected proof layout: {proof:?}");
    };
    let side_nodes: Vec<[u8; 32]> = side_nodes
        .iter()
        .map(|node| {
            let Token::FixedBytes(node) = node else {
                panic!("side node is not bytes32: {node:?}");
            };
            node.as_slice().try_into().unwrap()
        })
        .collect();
    let leaf = ethers::abi::encode(&[
        Token::Uint(*height),
        Token::FixedBytes(data_root.clone()),
    ]);

    let valid = roots.get(&nonce.as_u64()).is_some_and(|root| {
        merkle::audit::Proof::new(side_nodes, key.as_usize(), num_leaves.as_usize())
            .is_ok_and(|proof| proof.verify(&leaf, *root))
    });
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": body.get("id"),
        "result": format!("0x{}", hex::encode(ethers::abi::encode(&[Token::Bool(valid)]))),
    }))
}
