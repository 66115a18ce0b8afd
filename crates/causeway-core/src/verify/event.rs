use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::codec::{self, Item};

/// Errors extracting the transfer event from a receipt.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed receipt: {reason}")]
    MalformedReceipt { reason: String },

    #[error("receipt contains no log matching the transfer signature")]
    NoMatchingLog,

    #[error("bad transfer log shape: {reason}")]
    BadLogShape { reason: String },
}

/// The semantic transfer extracted from a verified receipt: who deposited
/// which token and how much.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferEvent {
    pub owner: Address,
    pub token: Address,
    pub amount: U256,
}

/// External event-decoding collaborator: a deterministic, pure function
/// from receipt bytes to a transfer event. Injected so the proof engine
/// stays independent of any one chain's event conventions.
pub trait TransferDecoder {
    fn decode_transfer(&self, receipt_bytes: &[u8]) -> Result<TransferEvent, EventError>;
}

/// Decodes the child chain's canonical receipt encoding
/// (`[status, cumulative_gas, bloom, logs]`, with an optional leading type
/// byte on typed receipts) and extracts the first log whose first topic
/// equals the configured transfer signature.
///
/// Log convention: the emitting contract is the token, the second topic
/// carries the depositor address in its low 20 bytes, and the log data is
/// the big-endian amount.
#[derive(Clone, Debug)]
pub struct LogTransferDecoder {
    signature: [u8; 32],
}

impl LogTransferDecoder {
    pub fn new(signature: [u8; 32]) -> Self {
        LogTransferDecoder { signature }
    }
}

impl TransferDecoder for LogTransferDecoder {
    fn decode_transfer(&self, receipt_bytes: &[u8]) -> Result<TransferEvent, EventError> {
        // Typed receipts carry a single type byte before the payload
        let payload = match receipt_bytes.first() {
            Some(&byte) if byte <= 0x7f => &receipt_bytes[1..],
            Some(_) => receipt_bytes,
            None => {
                return Err(EventError::MalformedReceipt {
                    reason: "empty receipt".into(),
                })
            }
        };

        let decoded = codec::decode(payload).map_err(|e| EventError::MalformedReceipt {
            reason: e.to_string(),
        })?;
        let fields = decoded.as_list().ok_or_else(|| EventError::MalformedReceipt {
            reason: "receipt is not a list".into(),
        })?;
        if fields.len() != 4 {
            return Err(EventError::MalformedReceipt {
                reason: format!("receipt has {} fields, expected 4", fields.len()),
            });
        }

        let logs = fields[3].as_list().ok_or_else(|| EventError::MalformedReceipt {
            reason: "logs field is not a list".into(),
        })?;

        for log in logs {
            let entries = log.as_list().ok_or_else(|| EventError::MalformedReceipt {
                reason: "log is not a list".into(),
            })?;
            if entries.len() != 3 {
                return Err(EventError::MalformedReceipt {
                    reason: format!("log has {} fields, expected 3", entries.len()),
                });
            }
            let topics = entries[1].as_list().ok_or_else(|| EventError::MalformedReceipt {
                reason: "log topics is not a list".into(),
            })?;

            let first_topic = topics.first().and_then(Item::as_bytes);
            if first_topic != Some(self.signature.as_slice()) {
                continue;
            }

            return extract_transfer(entries, topics);
        }

        Err(EventError::NoMatchingLog)
    }
}

fn extract_transfer(entries: &[Item], topics: &[Item]) -> Result<TransferEvent, EventError> {
    let address_bytes = entries[0].as_bytes().ok_or_else(|| EventError::BadLogShape {
        reason: "emitter address is not a byte string".into(),
    })?;
    if address_bytes.len() != 20 {
        return Err(EventError::BadLogShape {
            reason: format!("emitter address is {} bytes", address_bytes.len()),
        });
    }
    let token = Address::from_slice(address_bytes);

    let owner_topic = topics
        .get(1)
        .and_then(Item::as_bytes)
        .ok_or_else(|| EventError::BadLogShape {
            reason: "missing depositor topic".into(),
        })?;
    if owner_topic.len() != 32 {
        return Err(EventError::BadLogShape {
            reason: format!("depositor topic is {} bytes", owner_topic.len()),
        });
    }
    let owner = Address::from_slice(&owner_topic[12..]);

    let data = entries[2].as_bytes().ok_or_else(|| EventError::BadLogShape {
        reason: "log data is not a byte string".into(),
    })?;
    if data.len() > 32 {
        return Err(EventError::BadLogShape {
            reason: format!("amount is {} bytes, wider than 256 bits", data.len()),
        });
    }
    let amount = U256::from_be_slice(data);

    Ok(TransferEvent { owner, token, amount })
}
