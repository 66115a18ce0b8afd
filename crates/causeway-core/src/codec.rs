use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum nesting depth accepted by the decoder. Proof material never
/// nests more than a handful of levels; anything deeper is adversarial.
const MAX_DEPTH: usize = 64;

/// Errors from decoding the chain's length-prefixed binary format.
/// All of them mean "malformed encoding" — the input is rejected, never
/// partially decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed encoding: input ended inside a {context}")]
    UnexpectedEnd { context: &'static str },

    #[error("malformed encoding: length prefix {length} overflows the remaining {remaining} bytes")]
    LengthOverflow { length: u64, remaining: usize },

    #[error("malformed encoding: {extra} trailing bytes after the top-level value")]
    TrailingBytes { extra: usize },

    #[error("malformed encoding: non-canonical form ({reason})")]
    NonCanonical { reason: &'static str },

    #[error("malformed encoding: nesting deeper than {} levels", MAX_DEPTH)]
    NestingTooDeep,
}

/// A decoded value: either a byte string or an ordered sequence of values.
/// This is the self-describing shape shared by headers, transactions,
/// receipts, and trie nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Bytes(Vec<u8>),
    List(Vec<Item>),
}

impl Item {
    /// The byte-string payload, or None for a list.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Item::Bytes(b) => Some(b),
            Item::List(_) => None,
        }
    }

    /// The list elements, or None for a byte string.
    pub fn as_list(&self) -> Option<&[Item]> {
        match self {
            Item::Bytes(_) => None,
            Item::List(items) => Some(items),
        }
    }
}

/// Decode a single top-level value. Rejects truncated input, length
/// prefixes that overflow the remaining buffer, non-canonical forms, and
/// trailing bytes. Every length is bounds-checked against the remaining
/// buffer before any allocation happens.
pub fn decode(data: &[u8]) -> Result<Item, CodecError> {
    let (item, used) = decode_at(data, 0)?;
    if used != data.len() {
        return Err(CodecError::TrailingBytes {
            extra: data.len() - used,
        });
    }
    Ok(item)
}

/// Encode a value back to its canonical byte form.
/// `encode(decode(b)?) == b` holds for every validly-encoded input.
pub fn encode(item: &Item) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

/// Encode a sequence of values as a single list without cloning them into
/// an owned `Item::List` first. Used for canonical header re-encoding.
pub fn encode_list(items: &[Item]) -> Vec<u8> {
    let mut payload = Vec::new();
    for item in items {
        encode_into(item, &mut payload);
    }
    let mut out = Vec::with_capacity(payload.len() + 9);
    write_length(&mut out, payload.len(), 0xc0);
    out.extend_from_slice(&payload);
    out
}

/// Minimal big-endian byte representation of an integer (empty for zero).
/// This is how numeric header fields are carried on the wire.
pub fn uint_bytes(value: u64) -> Vec<u8> {
    let be = value.to_be_bytes();
    let start = be.iter().position(|&b| b != 0).unwrap_or(8);
    be[start..].to_vec()
}

/// Parse a minimal big-endian integer field.
/// None for over-long (> 8 bytes) or non-minimal (leading zero) forms.
pub fn uint_from_bytes(bytes: &[u8]) -> Option<u64> {
    if bytes.len() > 8 || bytes.first() == Some(&0) {
        return None;
    }
    let mut value: u64 = 0;
    for &b in bytes {
        value = (value << 8) | b as u64;
    }
    Some(value)
}

/// Decode one value at the start of `data`, returning it and the number of
/// bytes consumed.
fn decode_at(data: &[u8], depth: usize) -> Result<(Item, usize), CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::NestingTooDeep);
    }
    let prefix = *data.first().ok_or(CodecError::UnexpectedEnd {
        context: "value prefix",
    })?;

    match prefix {
        // Single byte below 0x80 encodes itself
        0x00..=0x7f => Ok((Item::Bytes(vec![prefix]), 1)),

        // Short string: 0-55 payload bytes
        0x80..=0xb7 => {
            let length = (prefix - 0x80) as usize;
            let payload = data
                .get(1..1 + length)
                .ok_or(CodecError::LengthOverflow {
                    length: length as u64,
                    remaining: data.len() - 1,
                })?;
            if length == 1 && payload[0] <= 0x7f {
                return Err(CodecError::NonCanonical {
                    reason: "single byte below 0x80 must encode as itself",
                });
            }
            Ok((Item::Bytes(payload.to_vec()), 1 + length))
        }

        // Long string: the next (prefix - 0xb7) bytes are the length
        0xb8..=0xbf => {
            let (length, start) = read_long_length(data, prefix - 0xb7)?;
            let payload = &data[start..start + length];
            Ok((Item::Bytes(payload.to_vec()), start + length))
        }

        // Short list: 0-55 payload bytes
        0xc0..=0xf7 => {
            let length = (prefix - 0xc0) as usize;
            let payload = data
                .get(1..1 + length)
                .ok_or(CodecError::LengthOverflow {
                    length: length as u64,
                    remaining: data.len() - 1,
                })?;
            let items = decode_list_payload(payload, depth)?;
            Ok((Item::List(items), 1 + length))
        }

        // Long list
        0xf8..=0xff => {
            let (length, start) = read_long_length(data, prefix - 0xf7)?;
            let items = decode_list_payload(&data[start..start + length], depth)?;
            Ok((Item::List(items), start + length))
        }
    }
}

/// Read the big-endian length of a long-form string or list.
/// Returns (payload length, payload start offset). The length is checked
/// against the remaining buffer here, before the caller touches it.
fn read_long_length(data: &[u8], len_len: u8) -> Result<(usize, usize), CodecError> {
    let len_len = len_len as usize;
    let bytes = data.get(1..1 + len_len).ok_or(CodecError::UnexpectedEnd {
        context: "length prefix",
    })?;
    if bytes[0] == 0 {
        return Err(CodecError::NonCanonical {
            reason: "length prefix has a leading zero byte",
        });
    }
    // len_len <= 8, so this cannot overflow a u64
    let mut length: u64 = 0;
    for &b in bytes {
        length = (length << 8) | b as u64;
    }
    let remaining = data.len() - 1 - len_len;
    if length > remaining as u64 {
        return Err(CodecError::LengthOverflow { length, remaining });
    }
    if length <= 55 {
        return Err(CodecError::NonCanonical {
            reason: "long form used for a short payload",
        });
    }
    Ok((length as usize, 1 + len_len))
}

/// Decode a list payload into its items. Each item must consume bytes, so
/// this always terminates.
fn decode_list_payload(payload: &[u8], depth: usize) -> Result<Vec<Item>, CodecError> {
    let mut items = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let (item, used) = decode_at(&payload[offset..], depth + 1)?;
        items.push(item);
        offset += used;
    }
    Ok(items)
}

fn encode_into(item: &Item, out: &mut Vec<u8>) {
    match item {
        Item::Bytes(bytes) => {
            if bytes.len() == 1 && bytes[0] <= 0x7f {
                out.push(bytes[0]);
            } else {
                write_length(out, bytes.len(), 0x80);
                out.extend_from_slice(bytes);
            }
        }
        Item::List(items) => {
            let mut payload = Vec::new();
            for item in items {
                encode_into(item, &mut payload);
            }
            write_length(out, payload.len(), 0xc0);
            out.extend_from_slice(&payload);
        }
    }
}

fn write_length(out: &mut Vec<u8>, length: usize, short_base: u8) {
    if length <= 55 {
        out.push(short_base + length as u8);
    } else {
        let be = (length as u64).to_be_bytes();
        let start = be.iter().position(|&b| b != 0).unwrap_or(7);
        let significant = &be[start..];
        out.push(short_base + 55 + significant.len() as u8);
        out.extend_from_slice(significant);
    }
}
