//! # Causeway Core
//!
//! Proof verification and checkpoint accounting for a two-chain asset
//! bridge: a root ledger holds custody of deposited tokens, a child
//! ledger executes transfers cheaply, and trust between them is
//! established purely by cryptographic proofs — never by a trusted
//! intermediary.
//!
//! This crate contains **no networking code** and **no I/O**. It is the
//! security boundary of the bridge — every child-chain event passes
//! through these verification functions before the root ledger acts on
//! it.
//!
//! ## Trust Model
//!
//! - **Checkpoint commitments** (`verify::checkpoint`): the external
//!   checkpoint author periodically commits a Merkle root over a range of
//!   child block headers. The author is trusted (or economically bonded)
//!   elsewhere; this crate only verifies membership in a committed root.
//!
//! - **Proof verification** (`verify::trie`, `verify::bundle`): given a
//!   committed checkpoint, a transaction's inclusion in a child block and
//!   its receipt's execution are verified with zero further trust
//!   assumptions. Every proof field is attacker-controlled until it
//!   passes.
//!
//! - **Deposit accounting** (`ledger`): a verified deposit fact becomes
//!   an exactly-once slot allocation — bounded per commit period,
//!   replay-protected by consumed source-transaction digests.
//!
//! ## Usage
//!
//! ```ignore
//! use causeway_core::{DepositGateway, LogTransferDecoder, PermissiveAccounts};
//!
//! let mut gateway = DepositGateway::new(source, decoder, policy, registry, 10_000);
//! gateway.open_period(period_ref);
//! let slot_id = gateway.submit_deposit(checkpoint_id, &bundle, now)?;
//! ```

pub mod bridge;
pub mod codec;
pub mod hash;
pub mod ledger;
pub mod types;
pub mod verify;

// Re-export the public surface for convenience
pub use bridge::{BridgeError, CheckpointSource, DepositGateway, InMemoryCheckpoints};
pub use codec::{decode, encode, CodecError, Item};
pub use hash::keccak256;
pub use ledger::{
    AccountClassifier, DepositLedger, LedgerError, PeriodState, PermissiveAccounts,
    TokenRegistry, CHILD_BLOCK_INTERVAL,
};
pub use types::header::{Header, HeaderError};
pub use types::proof::{
    Checkpoint, DepositFact, DepositSlot, HeaderInclusionProof, ProofBundle, TrieProof,
};
pub use verify::bundle::{validate_bundle, ProofError};
pub use verify::checkpoint::{
    build_checkpoint_root, header_inclusion_proof, verify_header_inclusion,
};
pub use verify::event::{EventError, LogTransferDecoder, TransferDecoder, TransferEvent};
pub use verify::trie::verify_trie_proof;
