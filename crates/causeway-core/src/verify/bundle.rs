use thiserror::Error;

use crate::hash::keccak256;
use crate::types::header::{Header, HeaderError};
use crate::types::proof::{Checkpoint, DepositFact, ProofBundle};
use crate::verify::checkpoint::verify_header_inclusion;
use crate::verify::event::{EventError, TransferDecoder};
use crate::verify::trie::verify_trie_proof;

/// Errors from full proof-bundle validation, one variant per pipeline
/// step. All are terminal: the same bundle will fail identically on
/// resubmission, so the caller must obtain a corrected proof.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error(transparent)]
    BadHeader(#[from] HeaderError),

    #[error("header number {number} outside checkpoint range {start_number}..={end_number}")]
    OutOfRange {
        number: u64,
        start_number: u64,
        end_number: u64,
    },

    #[error("header {number} is not committed in checkpoint {checkpoint_id}")]
    HeaderNotCommitted { number: u64, checkpoint_id: u32 },

    #[error("transaction is not included in the header's transaction trie")]
    TxNotIncluded,

    #[error("receipt is not included in the header's receipt trie")]
    ReceiptNotIncluded,

    #[error("unrecognized event: {0}")]
    UnrecognizedEvent(#[from] EventError),
}

/// Validate a full proof bundle against a committed checkpoint, yielding
/// the verified deposit fact.
///
/// Steps are order-sensitive to fail fast on the cheap checks:
/// 1. decode the header and recompute its position in the checkpoint range;
/// 2. verify the header digest is committed under the checkpoint root;
/// 3. verify the transaction is included under the header's transactions
///    root;
/// 4. verify the receipt is included under the header's receipts root, on
///    the same trie key as the transaction;
/// 5. decode the transfer event from the receipt;
/// 6. emit the fact, keyed by the transaction digest for replay tracking.
///
/// Pure and side-effect-free: no ledger state is touched, so callers may
/// run independent bundles through this in parallel.
pub fn validate_bundle(
    bundle: &ProofBundle,
    checkpoint: &Checkpoint,
    decoder: &dyn TransferDecoder,
) -> Result<DepositFact, ProofError> {
    // 1. Header shape and position. The position index is derived from
    //    the header's own number — never trusted from the prover.
    let header = Header::decode(&bundle.header_bytes)?;
    if !checkpoint.contains(header.number()) {
        return Err(ProofError::OutOfRange {
            number: header.number(),
            start_number: checkpoint.start_number,
            end_number: checkpoint.end_number,
        });
    }
    let position = header.number() - checkpoint.start_number;

    // 2. The header must be committed in the checkpoint tree
    let leaf_digest = header.digest();
    if !verify_header_inclusion(
        &checkpoint.root,
        &leaf_digest,
        position,
        &bundle.header_proof.siblings,
    ) {
        return Err(ProofError::HeaderNotCommitted {
            number: header.number(),
            checkpoint_id: checkpoint.id,
        });
    }

    // 3. The proven trie value must be the submitted transaction itself
    if bundle.tx_proof.value != bundle.tx_bytes
        || !verify_trie_proof(
            &header.transactions_root(),
            &bundle.tx_proof.key,
            &bundle.tx_proof,
        )
    {
        return Err(ProofError::TxNotIncluded);
    }

    // 4. Same for the receipt — and it must sit on the same trie key as
    //    the transaction, so the receipt genuinely belongs to it
    if bundle.receipt_proof.key != bundle.tx_proof.key
        || bundle.receipt_proof.value != bundle.receipt_bytes
        || !verify_trie_proof(
            &header.receipts_root(),
            &bundle.receipt_proof.key,
            &bundle.receipt_proof,
        )
    {
        return Err(ProofError::ReceiptNotIncluded);
    }

    // 5. Extract the semantic transfer from the verified receipt
    let event = decoder.decode_transfer(&bundle.receipt_bytes)?;

    // 6. The fact carries the tx digest as its replay-prevention key
    Ok(DepositFact::new(
        event.owner,
        event.token,
        event.amount,
        keccak256(&bundle.tx_bytes),
    ))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};

    use super::*;
    use crate::codec::{self, encode, Item};
    use crate::types::proof::TrieProof;
    use crate::verify::checkpoint::{build_checkpoint_root, header_inclusion_proof};
    use crate::verify::event::LogTransferDecoder;

    const SIGNATURE: [u8; 32] = [0xd0; 32];
    const TOKEN: [u8; 20] = [0xee; 20];
    const OWNER: [u8; 20] = [0xab; 20];

    /// Hex-prefix encode an even-length nibble path as a leaf.
    fn leaf_path(key: &[u8]) -> Vec<u8> {
        let mut out = vec![0x20];
        out.extend_from_slice(key);
        out
    }

    /// A single-entry trie holding `value` at `key`; returns (root, proof).
    fn single_leaf_trie(key: &[u8], value: &[u8]) -> ([u8; 32], TrieProof) {
        let node = encode(&Item::List(vec![
            Item::Bytes(leaf_path(key)),
            Item::Bytes(value.to_vec()),
        ]));
        let root = keccak256(&node);
        let proof = TrieProof {
            key: key.to_vec(),
            value: value.to_vec(),
            nodes: vec![node],
        };
        (root, proof)
    }

    fn sample_tx() -> Vec<u8> {
        encode(&Item::List(vec![
            Item::Bytes(codec::uint_bytes(1)),
            Item::Bytes(TOKEN.to_vec()),
            Item::Bytes(vec![0x64]),
        ]))
    }

    fn sample_receipt() -> Vec<u8> {
        let mut owner_topic = vec![0u8; 12];
        owner_topic.extend_from_slice(&OWNER);
        let log = Item::List(vec![
            Item::Bytes(TOKEN.to_vec()),
            Item::List(vec![
                Item::Bytes(SIGNATURE.to_vec()),
                Item::Bytes(owner_topic),
            ]),
            Item::Bytes(vec![0x64]),
        ]);
        encode(&Item::List(vec![
            Item::Bytes(vec![0x01]),
            Item::Bytes(codec::uint_bytes(21_000)),
            Item::Bytes(vec![0u8; 256]),
            Item::List(vec![log]),
        ]))
    }

    /// A bundle proving the deposit in block 101 of a checkpoint over
    /// blocks 100-101, plus the checkpoint it verifies against.
    fn sample_bundle() -> (ProofBundle, Checkpoint) {
        let tx_bytes = sample_tx();
        let receipt_bytes = sample_receipt();
        // Key 0x80 is the first transaction index in its minimal encoding
        let key = vec![0x80];
        let (tx_root, tx_proof) = single_leaf_trie(&key, &tx_bytes);
        let (receipts_root, receipt_proof) = single_leaf_trie(&key, &receipt_bytes);

        let headers = vec![
            Header::new([0x64; 32], 100, 1_700_000_000, [0x01; 32], [0x02; 32]),
            Header::new([0x65; 32], 101, 1_700_000_002, tx_root, receipts_root),
        ];
        let root = build_checkpoint_root(&headers).unwrap();
        let header_proof = header_inclusion_proof(&headers, 1).unwrap();

        let bundle = ProofBundle {
            header_bytes: headers[1].encoded(),
            header_proof,
            tx_bytes,
            tx_proof,
            receipt_bytes,
            receipt_proof,
        };
        let checkpoint = Checkpoint {
            id: 7,
            start_number: 100,
            end_number: 101,
            root,
            committed_at: 1_700_000_100,
        };
        (bundle, checkpoint)
    }

    fn decoder() -> LogTransferDecoder {
        LogTransferDecoder::new(SIGNATURE)
    }

    #[test]
    fn test_valid_bundle_yields_fact() {
        let (bundle, checkpoint) = sample_bundle();
        let fact = validate_bundle(&bundle, &checkpoint, &decoder()).unwrap();
        assert_eq!(fact.owner(), Address::from(OWNER));
        assert_eq!(fact.token(), Address::from(TOKEN));
        assert_eq!(fact.amount(), U256::from(100));
        assert_eq!(fact.source_tx_digest(), keccak256(&bundle.tx_bytes));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let (mut bundle, checkpoint) = sample_bundle();
        bundle.header_bytes = vec![0xc3, 0x01];
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &decoder()),
            Err(ProofError::BadHeader(_))
        ));
    }

    #[test]
    fn test_header_outside_range_rejected() {
        let (bundle, mut checkpoint) = sample_bundle();
        checkpoint.start_number = 102;
        checkpoint.end_number = 103;
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &decoder()),
            Err(ProofError::OutOfRange { number: 101, .. })
        ));
    }

    #[test]
    fn test_tampered_sibling_rejected() {
        let (mut bundle, checkpoint) = sample_bundle();
        bundle.header_proof.siblings[0][0] ^= 0x01;
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &decoder()),
            Err(ProofError::HeaderNotCommitted { number: 101, checkpoint_id: 7 })
        ));
    }

    #[test]
    fn test_substituted_tx_rejected() {
        let (mut bundle, checkpoint) = sample_bundle();
        // A different transaction than the one proven in the trie
        bundle.tx_bytes = encode(&Item::List(vec![Item::Bytes(vec![0xff; 8])]));
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &decoder()),
            Err(ProofError::TxNotIncluded)
        ));
    }

    #[test]
    fn test_mismatched_receipt_key_rejected() {
        let (mut bundle, checkpoint) = sample_bundle();
        // A receipt proven on a different trie key than the transaction
        bundle.receipt_proof.key = vec![0x01];
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &decoder()),
            Err(ProofError::ReceiptNotIncluded)
        ));
    }

    #[test]
    fn test_tampered_receipt_rejected() {
        let (mut bundle, checkpoint) = sample_bundle();
        bundle.receipt_bytes[10] ^= 0x01;
        bundle.receipt_proof.value = bundle.receipt_bytes.clone();
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &decoder()),
            Err(ProofError::ReceiptNotIncluded)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let (bundle, checkpoint) = sample_bundle();
        let wrong = LogTransferDecoder::new([0x99; 32]);
        assert!(matches!(
            validate_bundle(&bundle, &checkpoint, &wrong),
            Err(ProofError::UnrecognizedEvent(EventError::NoMatchingLog))
        ));
    }
}
