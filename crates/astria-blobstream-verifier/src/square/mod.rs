//! Reconstruction of the share layout of a Celestia data square.
//!
//! The layout is derived deterministically from the ordered transactions of a
//! block: ordinary transactions come first and are written as one compact share
//! sequence, followed by the compact sequence of the blob paying transactions.
//! Blobs follow after that, sorted by namespace, each starting at a multiple of
//! the width of the subtrees committing to it.
use std::fmt;

use celestia_types::nmt::Namespace;
use prost::Message as _;

pub mod proto;
mod shares;

use proto::{
    BlobTx,
    IndexWrapper,
    INDEX_WRAPPER_TYPE_ID,
};
pub use shares::SHARE_SIZE;
use shares::{
    blob_min_square_size,
    next_share_index,
    sparse_shares_needed,
    subtree_width,
    CompactShareCounter,
};

/// The share index written into an index wrapper when laying out the square,
/// before the actual indices are known. It is the index following the last share
/// of the largest permitted square, and so takes up the most bytes.
const WORST_CASE_SHARE_INDEX: u32 = 128 * 128;

/// The half-open range `[start, end)` of share indices in the original data square.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShareRange {
    start: usize,
    end: usize,
}

impl ShareRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
        }
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for ShareRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn unsupported_app_version(version: u64) -> Self {
        Self(ErrorKind::UnsupportedAppVersion {
            version,
        })
    }

    fn tx_after_blob_tx(index: usize) -> Self {
        Self(ErrorKind::TxAfterBlobTx {
            index,
        })
    }

    fn square_overflow(index: usize) -> Self {
        Self(ErrorKind::SquareOverflow {
            index,
        })
    }

    fn blob_namespace(tx_index: usize, blob_index: usize, source: celestia_types::Error) -> Self {
        Self(ErrorKind::BlobNamespace {
            tx_index,
            blob_index,
            source,
        })
    }

    fn namespace_version(tx_index: usize, blob_index: usize, version: u32) -> Self {
        Self(ErrorKind::NamespaceVersion {
            tx_index,
            blob_index,
            version,
        })
    }

    fn not_a_blob_tx(tx_index: usize) -> Self {
        Self(ErrorKind::NotABlobTx {
            tx_index,
        })
    }

    fn blob_index_out_of_range(tx_index: usize, blob_index: usize, num_blobs: usize) -> Self {
        Self(ErrorKind::BlobIndexOutOfRange {
            tx_index,
            blob_index,
            num_blobs,
        })
    }

    fn empty_blob(tx_index: usize, blob_index: usize) -> Self {
        Self(ErrorKind::EmptyBlob {
            tx_index,
            blob_index,
        })
    }

    fn outside_square(range: ShareRange, square_size: usize) -> Self {
        Self(ErrorKind::OutsideSquare {
            range,
            square_size,
        })
    }

    /// Returns if the requested blob is not part of the square, as opposed to the
    /// block not being a valid Celestia block.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self.0,
            ErrorKind::NotABlobTx { .. }
                | ErrorKind::BlobIndexOutOfRange { .. }
                | ErrorKind::OutsideSquare { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("app version `{version}` is not supported; supported versions are 1 and 2")]
    UnsupportedAppVersion { version: u64 },
    #[error(
        "transaction at index `{index}` is an ordinary transaction following a blob transaction"
    )]
    TxAfterBlobTx { index: usize },
    #[error("transaction at index `{index}` does not fit into the largest permitted square")]
    SquareOverflow { index: usize },
    #[error("blob `{blob_index}` of transaction `{tx_index}` has an invalid namespace")]
    BlobNamespace {
        tx_index: usize,
        blob_index: usize,
        source: celestia_types::Error,
    },
    #[error(
        "blob `{blob_index}` of transaction `{tx_index}` has namespace version `{version}`, \
         which does not fit into a byte"
    )]
    NamespaceVersion {
        tx_index: usize,
        blob_index: usize,
        version: u32,
    },
    #[error("transaction at index `{tx_index}` is not a blob transaction")]
    NotABlobTx { tx_index: usize },
    #[error(
        "blob index `{blob_index}` is out of range; transaction `{tx_index}` carries \
         `{num_blobs}` blobs"
    )]
    BlobIndexOutOfRange {
        tx_index: usize,
        blob_index: usize,
        num_blobs: usize,
    },
    #[error("blob `{blob_index}` of transaction `{tx_index}` is empty")]
    EmptyBlob { tx_index: usize, blob_index: usize },
    #[error("share range `{range}` extends past the square of width `{square_size}`")]
    OutsideSquare {
        range: ShareRange,
        square_size: usize,
    },
}

/// A blob at its final position in the square.
#[derive(Clone, Copy, Debug)]
struct PlacedBlob {
    namespace: Namespace,
    range: ShareRange,
}

/// Parameters of the square layout that are fixed per app version.
#[derive(Clone, Copy, Debug)]
struct Params {
    subtree_root_threshold: usize,
    max_square_size: usize,
}

impl Params {
    fn for_app_version(app_version: u64) -> Option<Self> {
        match app_version {
            1 | 2 => Some(Self {
                subtree_root_threshold: 64,
                max_square_size: 128,
            }),
            _ => None,
        }
    }
}

/// A blob as placed by the [`Builder`].
#[derive(Debug)]
struct Element {
    namespace: Namespace,
    pfb_index: usize,
    blob_index: usize,
    num_shares: usize,
    max_padding: usize,
}

/// Lays out the transactions of a block in the order they are appended.
struct Builder {
    params: Params,
    tx_counter: CompactShareCounter,
    pfb_counter: CompactShareCounter,
    num_txs: usize,
    blobs_per_pfb: Vec<usize>,
    elements: Vec<Element>,
    current_size: usize,
}

impl Builder {
    fn new(params: Params) -> Self {
        Self {
            params,
            tx_counter: CompactShareCounter::new(),
            pfb_counter: CompactShareCounter::new(),
            num_txs: 0,
            blobs_per_pfb: Vec::new(),
            elements: Vec::new(),
            current_size: 0,
        }
    }

    fn can_fit(&self, share_count: usize) -> bool {
        self.current_size + share_count <= self.params.max_square_size.pow(2)
    }

    /// Appends an ordinary transaction, returning if it fit into the square.
    fn append_tx(&mut self, tx: &[u8]) -> bool {
        let share_diff = self.tx_counter.add(tx.len());
        if !self.can_fit(share_diff) {
            self.tx_counter.revert();
            return false;
        }
        self.num_txs += 1;
        self.current_size += share_diff;
        true
    }

    /// Appends a blob paying transaction, returning if it and its blobs fit into
    /// the square.
    fn append_blob_tx(&mut self, tx_index: usize, blob_tx: BlobTx) -> Result<bool, Error> {
        let pfb_index = self.blobs_per_pfb.len();
        let mut elements = Vec::with_capacity(blob_tx.blobs.len());
        for (blob_index, blob) in blob_tx.blobs.iter().enumerate() {
            let version = u8::try_from(blob.namespace_version).map_err(|_| {
                Error::namespace_version(tx_index, blob_index, blob.namespace_version)
            })?;
            let namespace = Namespace::new(version, &blob.namespace_id)
                .map_err(|source| Error::blob_namespace(tx_index, blob_index, source))?;
            let num_shares = sparse_shares_needed(blob.data.len());
            elements.push(Element {
                namespace,
                pfb_index,
                blob_index,
                num_shares,
                max_padding: subtree_width(num_shares, self.params.subtree_root_threshold) - 1,
            });
        }

        let index_wrapper = IndexWrapper {
            share_indexes: vec![WORST_CASE_SHARE_INDEX; blob_tx.blobs.len()],
            tx: blob_tx.tx,
            type_id: INDEX_WRAPPER_TYPE_ID.to_string(),
        };
        let pfb_share_diff = self.pfb_counter.add(index_wrapper.encoded_len());
        let max_blob_share_count: usize = elements
            .iter()
            .map(|element| element.num_shares + element.max_padding)
            .sum();
        if !self.can_fit(pfb_share_diff + max_blob_share_count) {
            self.pfb_counter.revert();
            return Ok(false);
        }
        self.blobs_per_pfb.push(elements.len());
        self.elements.extend(elements);
        self.current_size += pfb_share_diff + max_blob_share_count;
        Ok(true)
    }

    fn export(self) -> Layout {
        let Self {
            params,
            tx_counter,
            pfb_counter,
            num_txs,
            blobs_per_pfb,
            mut elements,
            current_size,
        } = self;

        let square_size = blob_min_square_size(current_size);
        let mut blobs: Vec<Vec<Option<PlacedBlob>>> = blobs_per_pfb
            .iter()
            .map(|num_blobs| vec![None; *num_blobs])
            .collect();

        // stable, so blobs of one namespace stay in the order they were paid for
        elements.sort_by(|a, b| a.namespace.as_bytes().cmp(b.namespace.as_bytes()));
        let mut cursor = tx_counter.size() + pfb_counter.size();
        for element in elements {
            cursor = next_share_index(cursor, element.num_shares, params.subtree_root_threshold);
            blobs[element.pfb_index][element.blob_index] = Some(PlacedBlob {
                namespace: element.namespace,
                range: ShareRange::new(cursor, cursor + element.num_shares),
            });
            cursor += element.num_shares;
        }

        Layout {
            square_size,
            num_txs,
            blobs: blobs
                .into_iter()
                .map(|blobs| blobs.into_iter().flatten().collect())
                .collect(),
        }
    }
}

/// The positions of all blobs in the original data square of a block.
#[derive(Clone, Debug)]
pub struct Layout {
    square_size: usize,
    num_txs: usize,
    blobs: Vec<Vec<PlacedBlob>>,
}

impl Layout {
    /// Reconstructs the layout of the square built from `txs` under `app_version`.
    ///
    /// # Errors
    /// Returns an error if the app version is not supported, if an ordinary
    /// transaction follows a blob transaction, if a transaction does not fit into
    /// the square, or if a blob carries an invalid namespace. None of these occur
    /// for the transactions of a valid block.
    pub fn from_txs<T: AsRef<[u8]>>(txs: &[T], app_version: u64) -> Result<Self, Error> {
        let params = Params::for_app_version(app_version)
            .ok_or_else(|| Error::unsupported_app_version(app_version))?;
        let mut builder = Builder::new(params);
        let mut seen_blob_tx = false;
        for (index, tx) in txs.iter().map(AsRef::as_ref).enumerate() {
            let fits = if let Some(blob_tx) = proto::decode_blob_tx(tx) {
                seen_blob_tx = true;
                builder.append_blob_tx(index, blob_tx)?
            } else {
                if seen_blob_tx {
                    return Err(Error::tx_after_blob_tx(index));
                }
                builder.append_tx(tx)
            };
            if !fits {
                return Err(Error::square_overflow(index));
            }
        }
        Ok(builder.export())
    }

    /// The width of the original data square.
    #[must_use]
    pub fn square_size(&self) -> usize {
        self.square_size
    }

    /// The number of shares in the original data square.
    #[must_use]
    pub fn total_shares(&self) -> usize {
        self.square_size * self.square_size
    }

    /// Returns the share range of blob `blob_index` of the transaction at `tx_index`.
    ///
    /// # Errors
    /// Returns an error if the transaction is not a blob transaction, if it carries
    /// fewer than `blob_index + 1` blobs, or if the blob's range extends past the
    /// square. Empty blobs never occur in valid blocks and are rejected as well.
    pub fn blob_share_range(
        &self,
        tx_index: usize,
        blob_index: usize,
    ) -> Result<ShareRange, Error> {
        let blobs = self
            .blobs_of(tx_index)
            .ok_or_else(|| Error::not_a_blob_tx(tx_index))?;
        let range = blobs
            .get(blob_index)
            .ok_or_else(|| Error::blob_index_out_of_range(tx_index, blob_index, blobs.len()))?
            .range;
        if range.is_empty() {
            return Err(Error::empty_blob(tx_index, blob_index));
        }
        if range.end() > self.total_shares() {
            return Err(Error::outside_square(range, self.square_size));
        }
        Ok(range)
    }

    /// Returns the namespace of blob `blob_index` of the transaction at `tx_index`.
    #[must_use]
    pub fn blob_namespace(&self, tx_index: usize, blob_index: usize) -> Option<Namespace> {
        self.blobs_of(tx_index)?
            .get(blob_index)
            .map(|blob| blob.namespace)
    }

    fn blobs_of(&self, tx_index: usize) -> Option<&[PlacedBlob]> {
        let pfb_index = tx_index.checked_sub(self.num_txs)?;
        self.blobs.get(pfb_index).map(Vec::as_slice)
    }

    /// Iterates over the share ranges of all blobs as `(tx_index, blob_index, range)`,
    /// in transaction order.
    pub fn blob_ranges(&self) -> impl Iterator<Item = (usize, usize, ShareRange)> + '_ {
        self.blobs
            .iter()
            .enumerate()
            .flat_map(move |(pfb_index, blobs)| {
                blobs.iter().enumerate().map(move |(blob_index, blob)| {
                    (self.num_txs + pfb_index, blob_index, blob.range)
                })
            })
    }
}

/// Returns the share range of blob `blob_index` of the transaction at `tx_index`
/// in the square built from `txs` under `app_version`.
///
/// # Errors
/// See [`Layout::from_txs`] and [`Layout::blob_share_range`].
pub fn blob_share_range<T: AsRef<[u8]>>(
    txs: &[T],
    tx_index: usize,
    blob_index: usize,
    app_version: u64,
) -> Result<ShareRange, Error> {
    Layout::from_txs(txs, app_version)?.blob_share_range(tx_index, blob_index)
}
