//! Recognizing transactions that pay for blobs.
//!
//! The wire messages are the `proto.blob.v1` types shipped with `celestia-proto`.
pub use celestia_proto::proto::blob::v1::{
    BlobProto as Blob,
    BlobTx,
    IndexWrapper,
};
use celestia_types::nmt::NS_ID_SIZE;

pub const BLOB_TX_TYPE_ID: &str = "BLOB";
pub const INDEX_WRAPPER_TYPE_ID: &str = "INDX";

/// Decodes `tx` as a [`BlobTx`].
///
/// Returns `None` if `tx` is an ordinary transaction. A message tagged as a blob
/// transaction still counts as ordinary if it carries no blobs or if one of its
/// blobs has a namespace id that is not 28 bytes long.
#[must_use]
pub fn decode_blob_tx(tx: &[u8]) -> Option<BlobTx> {
    use prost::Message as _;
    let blob_tx = BlobTx::decode(tx).ok()?;
    if blob_tx.type_id != BLOB_TX_TYPE_ID || blob_tx.blobs.is_empty() {
        return None;
    }
    blob_tx
        .blobs
        .iter()
        .all(|blob| blob.namespace_id.len() == NS_ID_SIZE)
        .then_some(blob_tx)
}
