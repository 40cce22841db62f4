//! A Celestia block of square size 4 carrying a single blob, and the proofs a
//! celestia-core node would serve for it.
use astria_blobstream_verifier::square::{
    proto::{
        Blob,
        BlobTx,
        BLOB_TX_TYPE_ID,
    },
    ShareRange,
    SHARE_SIZE,
};
use base64::{
    engine::general_purpose::STANDARD,
    Engine as _,
};
use celestia_types::nmt::{
    Namespace,
    NS_SIZE,
};
use nmt_rs::{
    CelestiaNmt,
    NamespaceId,
    NamespaceMerkleHasher as _,
    NamespacedHash,
    NamespacedSha2Hasher,
};
use prost::Message as _;
use serde_json::json;
use tendermint_proto::v0_34::{
    types::{
        Block as RawBlock,
        BlockId as RawBlockId,
        Commit as RawCommit,
        Data as RawData,
        Header as RawHeader,
        PartSetHeader as RawPartSetHeader,
    },
    version::Consensus,
};
use tendermint_rpc::endpoint::block;

const WIDTH: usize = 4;
const PARITY: NamespaceId<NS_SIZE> = NamespaceId::MAX_ID;

/// The shares of the blob paid for by the second transaction of the block.
pub const BLOB_SHARES: ShareRange = ShareRange::new(2, 5);

fn namespace(suffix: &[u8]) -> Namespace {
    let mut id = [0; 28];
    id[28 - suffix.len()..].copy_from_slice(suffix);
    Namespace::new(0, &id).unwrap()
}

fn tx_namespace() -> Namespace {
    namespace(&[1])
}

pub fn blob_namespace() -> Namespace {
    namespace(b"astriablob")
}

fn tail_padding_namespace() -> Namespace {
    namespace(&[0xff; 10])
}

fn to_bytes(hash: &NamespacedHash<NS_SIZE>) -> Vec<u8> {
    hash.iter().collect()
}

fn row_tree() -> CelestiaNmt {
    CelestiaNmt::with_hasher(NamespacedSha2Hasher::with_ignore_max_ns(true))
}

/// The extended row holding `row`, with made up parity shares.
fn extended_row(row: &[Vec<u8>]) -> CelestiaNmt {
    let mut tree = row_tree();
    for share in row {
        let namespace = NamespaceId(share[..NS_SIZE].try_into().unwrap());
        tree.push_leaf(share, namespace).unwrap();
    }
    for _ in 0..WIDTH {
        tree.push_leaf(&[0xee; SHARE_SIZE], PARITY).unwrap();
    }
    tree
}

fn empty_block_id() -> RawBlockId {
    RawBlockId {
        hash: vec![],
        part_set_header: Some(RawPartSetHeader::default()),
    }
}

pub struct Block {
    pub txs: Vec<Vec<u8>>,
    shares: Vec<Vec<u8>>,
    row_roots: Vec<NamespacedHash<NS_SIZE>>,
    data_tree: merkle::Tree,
}

impl Block {
    /// An ordinary transaction of 100 bytes followed by a blob transaction paying
    /// for one blob of 1000 bytes, which occupies shares `[2, 5)`.
    pub fn new() -> Self {
        let txs = vec![
            vec![0xaa; 100],
            BlobTx {
                tx: vec![0xbb; 200],
                blobs: vec![Blob {
                    namespace_id: blob_namespace().id().to_vec(),
                    data: vec![0xcc; 1000],
                    share_version: 0,
                    namespace_version: 0,
                    ..Blob::default()
                }],
                type_id: BLOB_TX_TYPE_ID.to_string(),
            }
            .encode_to_vec(),
        ];

        let shares: Vec<_> = (0..WIDTH * WIDTH)
            .map(|i| {
                let namespace = if i < BLOB_SHARES.start() {
                    tx_namespace()
                } else if i < BLOB_SHARES.end() {
                    blob_namespace()
                } else {
                    tail_padding_namespace()
                };
                let mut share = namespace.as_bytes().to_vec();
                share.resize(SHARE_SIZE, u8::try_from(i).unwrap());
                share
            })
            .collect();

        let mut parity_row = row_tree();
        for _ in 0..2 * WIDTH {
            parity_row.push_leaf(&[0xdd; SHARE_SIZE], PARITY).unwrap();
        }

        let mut row_roots: Vec<_> = shares
            .chunks(WIDTH)
            .map(|row| extended_row(row).root())
            .collect();
        row_roots.extend(std::iter::repeat(parity_row.root()).take(WIDTH));
        let column_roots = (0..2 * WIDTH).map(|i| {
            NamespacedHash::new(
                tx_namespace().into(),
                PARITY,
                [u8::try_from(i).unwrap(); 32],
            )
        });
        let data_tree = merkle::Tree::from_leaves(
            row_roots
                .iter()
                .cloned()
                .chain(column_roots)
                .map(|root| to_bytes(&root)),
        );
        Self {
            txs,
            shares,
            row_roots,
            data_tree,
        }
    }

    pub fn data_root(&self) -> [u8; 32] {
        self.data_tree.root()
    }

    /// The block at `height` as returned by the `block` RPC.
    pub fn block_response(&self, height: u64) -> block::Response {
        let height = i64::try_from(height).unwrap();
        let raw = RawBlock {
            header: Some(RawHeader {
                version: Some(Consensus {
                    block: 11,
                    app: 2,
                }),
                chain_id: "mocha-4".to_string(),
                height,
                time: Some(tendermint_proto::google::protobuf::Timestamp {
                    seconds: 1_700_000_000,
                    nanos: 0,
                }),
                last_block_id: Some(empty_block_id()),
                data_hash: self.data_root().to_vec(),
                proposer_address: vec![0; 20],
                ..RawHeader::default()
            }),
            data: Some(RawData {
                txs: self.txs.clone(),
            }),
            evidence: Some(Default::default()),
            last_commit: Some(RawCommit {
                height: height - 1,
                round: 0,
                block_id: Some(empty_block_id()),
                signatures: vec![],
            }),
        };
        block::Response {
            block_id: empty_block_id().try_into().unwrap(),
            block: raw.try_into().unwrap(),
        }
    }

    /// The `prove_shares` result for `range`. If `tampered`, the first proven share
    /// is altered after the proof was constructed.
    pub fn share_proof_json(&self, range: ShareRange, tampered: bool) -> serde_json::Value {
        let start_row = range.start() / WIDTH;
        let end_row = (range.end() - 1) / WIDTH;
        let mut share_proofs = Vec::new();
        let mut row_proofs = Vec::new();
        for row in start_row..=end_row {
            let start = if row == start_row {
                range.start() % WIDTH
            } else {
                0
            };
            let end = if row == end_row {
                (range.end() - 1) % WIDTH + 1
            } else {
                WIDTH
            };
            let proof = extended_row(&self.shares[row * WIDTH..(row + 1) * WIDTH])
                .build_range_proof(start..end);
            share_proofs.push(json!({
                "start": start,
                "end": end,
                "nodes": proof
                    .siblings
                    .iter()
                    .map(|node| STANDARD.encode(to_bytes(node)))
                    .collect::<Vec<_>>(),
            }));
            let proof = self.data_tree.construct_proof(row).unwrap();
            row_proofs.push(json!({
                "total": (4 * WIDTH).to_string(),
                "index": row.to_string(),
                "leaf_hash": STANDARD.encode(merkle::hash_leaf(&to_bytes(&self.row_roots[row]))),
                "aunts": proof
                    .audit_path()
                    .iter()
                    .map(|aunt| STANDARD.encode(aunt))
                    .collect::<Vec<_>>(),
            }));
        }

        let mut data = self.shares[range.start()..range.end()].to_vec();
        if tampered {
            data[0][SHARE_SIZE - 1] ^= 1;
        }
        json!({
            "data": data.iter().map(|share| STANDARD.encode(share)).collect::<Vec<_>>(),
            "share_proofs": share_proofs,
            "namespace_id": STANDARD.encode(blob_namespace().id()),
            "row_proof": {
                "row_roots": self.row_roots[start_row..=end_row]
                    .iter()
                    .map(|root| hex::encode_upper(to_bytes(root)))
                    .collect::<Vec<_>>(),
                "proofs": row_proofs,
                "start_row": start_row,
                "end_row": end_row,
            },
            "namespace_version": 0,
        })
    }
}
