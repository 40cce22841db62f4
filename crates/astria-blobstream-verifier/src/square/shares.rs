//! Share accounting for the compact and sparse share formats.

/// The size of a share in bytes.
pub const SHARE_SIZE: usize = 512;

const NAMESPACE_SIZE: usize = celestia_types::nmt::NS_SIZE;
const SHARE_INFO_BYTES: usize = 1;
const SEQUENCE_LEN_BYTES: usize = 4;
const SHARE_RESERVED_BYTES: usize = 4;

/// Bytes available for transaction data in the first share of a compact sequence.
pub(super) const FIRST_COMPACT_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SEQUENCE_LEN_BYTES - SHARE_RESERVED_BYTES;
/// Bytes available for transaction data in every other share of a compact sequence.
pub(super) const CONTINUATION_COMPACT_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SHARE_RESERVED_BYTES;
/// Bytes available for blob data in the first share of a sparse sequence.
pub(super) const FIRST_SPARSE_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SEQUENCE_LEN_BYTES;
/// Bytes available for blob data in every other share of a sparse sequence.
pub(super) const CONTINUATION_SPARSE_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES;

/// Counts the shares taken up by a sequence of length delimited units written in
/// the compact share format.
///
/// The last addition can be undone with [`CompactShareCounter::revert`].
#[derive(Debug, Default)]
pub(super) struct CompactShareCounter {
    shares: usize,
    remainder: usize,
    last_shares: usize,
    last_remainder: usize,
}

impl CompactShareCounter {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Adds a unit of `data_len` bytes, returning by how many shares the sequence grew.
    pub(super) fn add(&mut self, data_len: usize) -> usize {
        self.last_shares = self.shares;
        self.last_remainder = self.remainder;

        let mut data_len = data_len + delimiter_len(data_len);
        if data_len <= self.remainder {
            self.remainder -= data_len;
            return 0;
        }
        data_len -= self.remainder;

        if self.shares == 0 {
            self.shares = 1;
            if data_len <= FIRST_COMPACT_SHARE_CONTENT_SIZE {
                self.remainder = FIRST_COMPACT_SHARE_CONTENT_SIZE - data_len;
                return 1;
            }
            data_len -= FIRST_COMPACT_SHARE_CONTENT_SIZE;
        }
        let continuation_shares = data_len.div_ceil(CONTINUATION_COMPACT_SHARE_CONTENT_SIZE);
        self.shares += continuation_shares;
        self.remainder = continuation_shares * CONTINUATION_COMPACT_SHARE_CONTENT_SIZE - data_len;
        self.shares - self.last_shares
    }

    pub(super) fn revert(&mut self) {
        self.shares = self.last_shares;
        self.remainder = self.last_remainder;
    }

    pub(super) fn size(&self) -> usize {
        self.shares
    }
}

/// The length of the varint prefix delimiting a unit of `data_len` bytes.
pub(super) fn delimiter_len(data_len: usize) -> usize {
    let mut len = 1;
    let mut rest = data_len >> 7;
    while rest > 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// The number of shares needed to store a blob of `data_len` bytes.
pub(super) fn sparse_shares_needed(data_len: usize) -> usize {
    if data_len == 0 {
        return 0;
    }
    if data_len <= FIRST_SPARSE_SHARE_CONTENT_SIZE {
        return 1;
    }
    1 + (data_len - FIRST_SPARSE_SHARE_CONTENT_SIZE)
        .div_ceil(CONTINUATION_SPARSE_SHARE_CONTENT_SIZE)
}

/// The smallest square width able to hold `share_count` shares.
pub(super) fn blob_min_square_size(share_count: usize) -> usize {
    ceil_sqrt(share_count).next_power_of_two()
}

/// The width of the subtrees whose roots commit to a blob of `share_count` shares.
pub(super) fn subtree_width(share_count: usize, subtree_root_threshold: usize) -> usize {
    share_count
        .div_ceil(subtree_root_threshold)
        .next_power_of_two()
        .min(blob_min_square_size(share_count))
}

/// The first index at or after `cursor` at which a blob of `share_count` shares
/// may start.
pub(super) fn next_share_index(
    cursor: usize,
    share_count: usize,
    subtree_root_threshold: usize,
) -> usize {
    cursor.next_multiple_of(subtree_width(share_count, subtree_root_threshold))
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = 0;
    while root * root < n {
        root += 1;
    }
    root
}
