use std::collections::BTreeMap;

use alloy_primitives::U256;
use thiserror::Error;
use tracing::{debug, info};

use crate::ledger::{AccountClassifier, DepositLedger, LedgerError, TokenRegistry};
use crate::types::proof::{Checkpoint, ProofBundle};
use crate::verify::bundle::{validate_bundle, ProofError};
use crate::verify::event::TransferDecoder;

/// Read-only view of the checkpoints committed by the external checkpoint
/// author. This crate never writes a checkpoint.
pub trait CheckpointSource {
    fn checkpoint(&self, id: u32) -> Option<Checkpoint>;
}

/// An in-memory checkpoint store, for tests and relayers that mirror the
/// committed records locally.
#[derive(Debug, Default)]
pub struct InMemoryCheckpoints {
    by_id: BTreeMap<u32, Checkpoint>,
}

impl InMemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, checkpoint: Checkpoint) {
        self.by_id.insert(checkpoint.id, checkpoint);
    }
}

impl CheckpointSource for InMemoryCheckpoints {
    fn checkpoint(&self, id: u32) -> Option<Checkpoint> {
        self.by_id.get(&id).cloned()
    }
}

/// Errors surfaced to a submitting relayer. A rejected submission mutates
/// nothing.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no checkpoint committed with id {id}")]
    UnknownCheckpoint { id: u32 },

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The caller-facing deposit API: proof verification composed with ledger
/// accounting.
///
/// Verification (everything up to the fact) is pure and could run
/// anywhere; only the final `create_deposit` needs exclusive access to the
/// ledger, which this gateway owns.
pub struct DepositGateway<S, D, C, R>
where
    S: CheckpointSource,
    D: TransferDecoder,
    C: AccountClassifier,
    R: TokenRegistry,
{
    checkpoints: S,
    decoder: D,
    classifier: C,
    registry: R,
    ledger: DepositLedger,
}

impl<S, D, C, R> DepositGateway<S, D, C, R>
where
    S: CheckpointSource,
    D: TransferDecoder,
    C: AccountClassifier,
    R: TokenRegistry,
{
    pub fn new(
        checkpoints: S,
        decoder: D,
        classifier: C,
        registry: R,
        child_block_interval: u64,
    ) -> Self {
        DepositGateway {
            checkpoints,
            decoder,
            classifier,
            registry,
            ledger: DepositLedger::new(child_block_interval),
        }
    }

    /// Verify a proof bundle against the named checkpoint and, on
    /// success, allocate its deposit slot. Returns the slot id.
    pub fn submit_deposit(
        &mut self,
        checkpoint_id: u32,
        bundle: &ProofBundle,
        now: u64,
    ) -> Result<U256, BridgeError> {
        let checkpoint = self
            .checkpoints
            .checkpoint(checkpoint_id)
            .ok_or(BridgeError::UnknownCheckpoint { id: checkpoint_id })?;
        let fact = validate_bundle(bundle, &checkpoint, &self.decoder).map_err(|err| {
            debug!(checkpoint_id, %err, "deposit proof rejected");
            BridgeError::from(err)
        })?;
        let slot_id = self
            .ledger
            .create_deposit(&fact, now, &self.classifier, &self.registry)
            .map_err(|err| {
                debug!(checkpoint_id, %err, "verified deposit rejected by ledger");
                BridgeError::from(err)
            })?;
        info!(checkpoint_id, slot = %slot_id, "deposit accepted");
        Ok(slot_id)
    }

    /// Committer passthrough: open the next commit period.
    pub fn open_period(&mut self, period_header_ref: U256) {
        self.ledger.open_period(period_header_ref);
    }

    /// Committer passthrough: finalize the current commit period.
    pub fn finalize_period(&mut self) {
        self.ledger.finalize_period();
    }

    pub fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;
    use crate::codec::{self, encode, Item};
    use crate::hash::keccak256;
    use crate::ledger::{PermissiveAccounts, CHILD_BLOCK_INTERVAL};
    use crate::types::header::Header;
    use crate::types::proof::TrieProof;
    use crate::verify::checkpoint::{build_checkpoint_root, header_inclusion_proof};
    use crate::verify::event::LogTransferDecoder;

    const SIGNATURE: [u8; 32] = [0xd0; 32];

    struct AllTokens;
    impl TokenRegistry for AllTokens {
        fn is_token_mapped(&self, _token: &Address) -> bool {
            true
        }
    }

    fn single_leaf_trie(key: &[u8], value: &[u8]) -> ([u8; 32], TrieProof) {
        let mut path = vec![0x20];
        path.extend_from_slice(key);
        let node = encode(&Item::List(vec![
            Item::Bytes(path),
            Item::Bytes(value.to_vec()),
        ]));
        (
            keccak256(&node),
            TrieProof {
                key: key.to_vec(),
                value: value.to_vec(),
                nodes: vec![node],
            },
        )
    }

    fn sample_receipt(amount: u8) -> Vec<u8> {
        let mut owner_topic = vec![0u8; 12];
        owner_topic.extend_from_slice(&[0xab; 20]);
        let log = Item::List(vec![
            Item::Bytes(vec![0xee; 20]),
            Item::List(vec![
                Item::Bytes(SIGNATURE.to_vec()),
                Item::Bytes(owner_topic),
            ]),
            Item::Bytes(vec![amount]),
        ]);
        encode(&Item::List(vec![
            Item::Bytes(vec![0x01]),
            Item::Bytes(codec::uint_bytes(21_000)),
            Item::Bytes(vec![0u8; 256]),
            Item::List(vec![log]),
        ]))
    }

    /// A one-header checkpoint with a single proven deposit inside it.
    fn fixture(checkpoint_id: u32, block_number: u64, amount: u8) -> (Checkpoint, ProofBundle) {
        let tx_bytes = encode(&Item::List(vec![Item::Bytes(vec![amount, block_number as u8])]));
        let receipt_bytes = sample_receipt(amount);
        let key = vec![0x80];
        let (tx_root, tx_proof) = single_leaf_trie(&key, &tx_bytes);
        let (receipts_root, receipt_proof) = single_leaf_trie(&key, &receipt_bytes);

        let header = Header::new([0x07; 32], block_number, 0, tx_root, receipts_root);
        let root = build_checkpoint_root(std::slice::from_ref(&header)).unwrap();
        let header_proof = header_inclusion_proof(std::slice::from_ref(&header), 0).unwrap();

        let checkpoint = Checkpoint {
            id: checkpoint_id,
            start_number: block_number,
            end_number: block_number,
            root,
            committed_at: 0,
        };
        let bundle = ProofBundle {
            header_bytes: header.encoded(),
            header_proof,
            tx_bytes,
            tx_proof,
            receipt_bytes,
            receipt_proof,
        };
        (checkpoint, bundle)
    }

    fn gateway(
        checkpoints: InMemoryCheckpoints,
    ) -> DepositGateway<InMemoryCheckpoints, LogTransferDecoder, PermissiveAccounts, AllTokens>
    {
        DepositGateway::new(
            checkpoints,
            LogTransferDecoder::new(SIGNATURE),
            PermissiveAccounts,
            AllTokens,
            CHILD_BLOCK_INTERVAL,
        )
    }

    #[test]
    fn test_submit_deposit_end_to_end() {
        let (checkpoint, bundle) = fixture(1, 100, 0x64);
        let mut checkpoints = InMemoryCheckpoints::new();
        checkpoints.insert(checkpoint);

        let mut gateway = gateway(checkpoints);
        gateway.open_period(U256::from(2 * CHILD_BLOCK_INTERVAL));

        let slot_id = gateway.submit_deposit(1, &bundle, 1_700_000_000).unwrap();
        assert_eq!(slot_id, U256::from(CHILD_BLOCK_INTERVAL + 1));

        let slot = gateway.ledger().slot(&slot_id).unwrap();
        assert_eq!(slot.owner, Address::from([0xab; 20]));
        assert_eq!(slot.amount, U256::from(0x64));
    }

    #[test]
    fn test_duplicate_submission_yields_exactly_one_slot() {
        let (checkpoint, bundle) = fixture(1, 100, 0x64);
        let mut checkpoints = InMemoryCheckpoints::new();
        checkpoints.insert(checkpoint);

        let mut gateway = gateway(checkpoints);
        gateway.open_period(U256::from(2 * CHILD_BLOCK_INTERVAL));

        gateway.submit_deposit(1, &bundle, 0).unwrap();
        let err = gateway.submit_deposit(1, &bundle, 0).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Ledger(LedgerError::ReplayedProof { .. })
        ));
        // One slot, counter advanced exactly once
        assert_eq!(gateway.ledger().deposit_count(), 2);
    }

    #[test]
    fn test_unknown_checkpoint() {
        let (_, bundle) = fixture(1, 100, 0x64);
        let mut gateway = gateway(InMemoryCheckpoints::new());
        gateway.open_period(U256::from(2 * CHILD_BLOCK_INTERVAL));
        assert!(matches!(
            gateway.submit_deposit(9, &bundle, 0),
            Err(BridgeError::UnknownCheckpoint { id: 9 })
        ));
    }

    #[test]
    fn test_rejected_proof_touches_no_state() {
        let (checkpoint, mut bundle) = fixture(1, 100, 0x64);
        let mut checkpoints = InMemoryCheckpoints::new();
        checkpoints.insert(checkpoint);

        let mut gateway = gateway(checkpoints);
        gateway.open_period(U256::from(2 * CHILD_BLOCK_INTERVAL));

        bundle.tx_bytes.push(0x00);
        assert!(matches!(
            gateway.submit_deposit(1, &bundle, 0),
            Err(BridgeError::Proof(ProofError::TxNotIncluded))
        ));
        assert_eq!(gateway.ledger().deposit_count(), 1);
    }
}
