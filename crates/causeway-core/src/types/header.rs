use crate::codec::{self, CodecError, Item};
use crate::hash::keccak256;
use thiserror::Error;

/// Fixed field positions in a child-chain header list.
const POS_PARENT: usize = 0;
const POS_NUMBER: usize = 1;
const POS_TIMESTAMP: usize = 2;
const POS_TX_ROOT: usize = 3;
const POS_RECEIPTS_ROOT: usize = 4;

/// Minimum number of fields a header must carry. Fields past these are
/// opaque and kept only for canonical re-encoding.
pub const HEADER_FIELDS: usize = 5;

/// Errors projecting a decoded value into a typed header.
/// Collectively: "bad header shape".
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("bad header shape: {0}")]
    Encoding(#[from] CodecError),

    #[error("bad header shape: decoded value is not a list")]
    NotAList,

    #[error("bad header shape: {got} fields, need at least {}", HEADER_FIELDS)]
    TooFewFields { got: usize },

    #[error("bad header shape: field {position} is a nested list, expected a byte string")]
    FieldNotBytes { position: usize },

    #[error("bad header shape: field {position} is {got} bytes, expected a 32-byte digest")]
    BadDigestWidth { position: usize, got: usize },

    #[error("bad header shape: field {position} is not a minimal big-endian integer")]
    BadInteger { position: usize },
}

/// A read-only typed projection over a decoded child-chain block header.
///
/// The full decoded field list is retained so the header can be re-encoded
/// canonically: a header's identity is the keccak256 digest of that
/// re-encoding, and it must match the child chain's own header-hash
/// convention bit for bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    parent_digest: [u8; 32],
    number: u64,
    timestamp: u64,
    transactions_root: [u8; 32],
    receipts_root: [u8; 32],
    fields: Vec<Item>,
}

impl Header {
    /// Assemble a header from its fixed fields. Used by the checkpoint
    /// author and by tests; proofs arriving over the wire go through
    /// [`Header::decode`] instead.
    pub fn new(
        parent_digest: [u8; 32],
        number: u64,
        timestamp: u64,
        transactions_root: [u8; 32],
        receipts_root: [u8; 32],
    ) -> Self {
        let fields = vec![
            Item::Bytes(parent_digest.to_vec()),
            Item::Bytes(codec::uint_bytes(number)),
            Item::Bytes(codec::uint_bytes(timestamp)),
            Item::Bytes(transactions_root.to_vec()),
            Item::Bytes(receipts_root.to_vec()),
        ];
        Header {
            parent_digest,
            number,
            timestamp,
            transactions_root,
            receipts_root,
            fields,
        }
    }

    /// Decode raw header bytes and project the fixed fields.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        Self::from_decoded(codec::decode(bytes)?)
    }

    /// Project a decoded value into a typed header, checking the shape of
    /// every fixed-position field. Every input is attacker-controlled.
    pub fn from_decoded(value: Item) -> Result<Self, HeaderError> {
        let fields = match value {
            Item::List(fields) => fields,
            Item::Bytes(_) => return Err(HeaderError::NotAList),
        };
        if fields.len() < HEADER_FIELDS {
            return Err(HeaderError::TooFewFields { got: fields.len() });
        }

        let parent_digest = digest_field(&fields, POS_PARENT)?;
        let number = uint_field(&fields, POS_NUMBER)?;
        let timestamp = uint_field(&fields, POS_TIMESTAMP)?;
        let transactions_root = digest_field(&fields, POS_TX_ROOT)?;
        let receipts_root = digest_field(&fields, POS_RECEIPTS_ROOT)?;

        Ok(Header {
            parent_digest,
            number,
            timestamp,
            transactions_root,
            receipts_root,
            fields,
        })
    }

    /// Canonical re-encoding of the full field list.
    pub fn encoded(&self) -> Vec<u8> {
        codec::encode_list(&self.fields)
    }

    /// The header's identity: keccak256 of its canonical encoding.
    pub fn digest(&self) -> [u8; 32] {
        keccak256(&self.encoded())
    }

    pub fn parent_digest(&self) -> [u8; 32] {
        self.parent_digest
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions_root(&self) -> [u8; 32] {
        self.transactions_root
    }

    pub fn receipts_root(&self) -> [u8; 32] {
        self.receipts_root
    }
}

fn digest_field(fields: &[Item], position: usize) -> Result<[u8; 32], HeaderError> {
    let bytes = fields[position]
        .as_bytes()
        .ok_or(HeaderError::FieldNotBytes { position })?;
    if bytes.len() != 32 {
        return Err(HeaderError::BadDigestWidth {
            position,
            got: bytes.len(),
        });
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(bytes);
    Ok(digest)
}

fn uint_field(fields: &[Item], position: usize) -> Result<u64, HeaderError> {
    let bytes = fields[position]
        .as_bytes()
        .ok_or(HeaderError::FieldNotBytes { position })?;
    codec::uint_from_bytes(bytes).ok_or(HeaderError::BadInteger { position })
}
