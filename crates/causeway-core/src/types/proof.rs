use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A Merkle-Patricia inclusion proof for one (key, value) pair.
/// Caller-supplied and attacker-controlled until verified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieProof {
    /// The trie key being proven.
    pub key: Vec<u8>,
    /// The value claimed to live under the key.
    pub value: Vec<u8>,
    /// Encoded trie nodes covering the path from root to leaf. Order is
    /// not significant: the verifier indexes every node by its own
    /// recomputed digest and resolves references through that index.
    pub nodes: Vec<Vec<u8>>,
}

/// Sibling digests proving one header's membership in a checkpoint tree.
/// The position index is recomputed from the header number against the
/// checkpoint range — it is never taken from the prover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInclusionProof {
    /// Sibling hashes, leaf level first.
    pub siblings: Vec<[u8; 32]>,
}

/// Everything a relayer submits to claim one child-chain deposit on the
/// root ledger. Every field is untrusted input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBundle {
    /// The child block header, in its canonical encoding.
    pub header_bytes: Vec<u8>,
    /// Proof that the header is committed in the checkpoint tree.
    pub header_proof: HeaderInclusionProof,
    /// The deposit transaction, exactly as stored in the transaction trie.
    pub tx_bytes: Vec<u8>,
    /// Inclusion proof for the transaction under the header's
    /// transactions root.
    pub tx_proof: TrieProof,
    /// The transaction's execution receipt.
    pub receipt_bytes: Vec<u8>,
    /// Inclusion proof for the receipt under the header's receipts root.
    pub receipt_proof: TrieProof,
}

/// A committed Merkle root over a contiguous range of child-chain block
/// headers. Produced by the external checkpoint author; this crate only
/// reads checkpoints, never writes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Monotonic checkpoint id.
    pub id: u32,
    /// First child block number covered (inclusive).
    pub start_number: u64,
    /// Last child block number covered (inclusive).
    pub end_number: u64,
    /// Root of the binary Merkle tree over the covered header digests.
    pub root: [u8; 32],
    /// Root-chain timestamp at which the checkpoint was committed.
    pub committed_at: u64,
}

impl Checkpoint {
    /// Whether a child block number falls inside this checkpoint's range.
    pub fn contains(&self, number: u64) -> bool {
        self.start_number <= number && number <= self.end_number
    }
}

/// A verified child-chain deposit event.
///
/// Only successful bundle validation constructs one — callers can read a
/// fact but never forge it, which is what lets the ledger trust it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DepositFact {
    owner: Address,
    token: Address,
    amount: U256,
    source_tx_digest: [u8; 32],
}

impl DepositFact {
    pub(crate) fn new(
        owner: Address,
        token: Address,
        amount: U256,
        source_tx_digest: [u8; 32],
    ) -> Self {
        DepositFact {
            owner,
            token,
            amount,
            source_tx_digest,
        }
    }

    /// The child-chain account that made the deposit.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The deposited token's address.
    pub fn token(&self) -> Address {
        self.token
    }

    /// The deposited amount. Zero amounts are rejected by the ledger.
    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Digest of the source transaction — the replay-prevention key.
    pub fn source_tx_digest(&self) -> [u8; 32] {
        self.source_tx_digest
    }
}

/// One allocated deposit slot: the root-side record authorizing custody
/// crediting for a verified deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSlot {
    /// Identity of the commit period the slot was allocated in.
    pub period_header_ref: U256,
    pub owner: Address,
    pub token: Address,
    pub amount: U256,
    /// Root-chain timestamp at slot creation.
    pub created_at: u64,
}
