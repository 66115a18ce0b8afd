use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::proof::{DepositFact, DepositSlot};

/// Conventional child-chain commit period length. Each period admits at
/// most `CHILD_BLOCK_INTERVAL - 1` deposit slots.
pub const CHILD_BLOCK_INTERVAL: u64 = 10_000;

/// Errors from deposit slot allocation. Every failure leaves the ledger
/// completely unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("current commit period is closed; deposits resume when the committer opens the next period")]
    PeriodClosed,

    #[error("deposit owner {owner} is not a simple account")]
    NonAccountOwner { owner: Address },

    #[error("deposit amount is zero")]
    ZeroAmount,

    #[error("token {token} has no registered mapping")]
    TokenNotMapped { token: Address },

    #[error("replayed proof: source transaction {source_tx} was already consumed")]
    ReplayedProof { source_tx: String },

    #[error("commit period is full ({capacity} slots)")]
    PeriodFull { capacity: u64 },
}

/// Whether the current commit period accepts new slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeriodState {
    Open,
    Closed,
}

/// Policy predicate deciding whether an address is a plain account.
///
/// On the source chain this blocks deposits from contract-owned addresses
/// to bound re-entrancy; ledgers without that distinction inject
/// [`PermissiveAccounts`] and the guard disappears.
pub trait AccountClassifier {
    fn is_simple_account(&self, owner: &Address) -> bool;
}

/// Accepts every address — for deployments where the contract-vs-account
/// distinction does not exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissiveAccounts;

impl AccountClassifier for PermissiveAccounts {
    fn is_simple_account(&self, _owner: &Address) -> bool {
        true
    }
}

/// External token mapping registry, queried once per deposit.
pub trait TokenRegistry {
    fn is_token_mapped(&self, token: &Address) -> bool;
}

/// Root-side deposit accounting: the only place deposit slots are created
/// or looked up.
///
/// A commit period is either Open (accepting slots 1 through
/// `interval - 1`) or Closed. Rollover is an explicit external call by
/// the checkpoint committer — never a hidden side effect of another
/// operation — and calling [`open_period`](Self::open_period) mid-period
/// simply truncates the current one. Every mutation is all-or-nothing:
/// a failed precondition leaves the counter, the slot map, and the
/// consumed-digest set untouched.
#[derive(Debug)]
pub struct DepositLedger {
    interval: u64,
    state: PeriodState,
    period_header_ref: U256,
    deposit_count: u64,
    slots: BTreeMap<U256, DepositSlot>,
    consumed: BTreeSet<[u8; 32]>,
}

impl DepositLedger {
    /// A ledger with the given commit period length (at least 2 for any
    /// capacity). Starts Closed: no deposits until the committer opens
    /// the first period.
    pub fn new(child_block_interval: u64) -> Self {
        DepositLedger {
            interval: child_block_interval,
            state: PeriodState::Closed,
            period_header_ref: U256::ZERO,
            deposit_count: 1,
            slots: BTreeMap::new(),
            consumed: BTreeSet::new(),
        }
    }

    /// Open the next commit period. External committer authority: the
    /// deposit counter resets to 1 and the period identity becomes
    /// `period_header_ref` (expected unique and at least the interval, so
    /// slot ids neither collide nor wrap). Calling this mid-period
    /// truncates the current period early; that is the committer's call
    /// to make, not ours to second-guess.
    pub fn open_period(&mut self, period_header_ref: U256) {
        self.period_header_ref = period_header_ref;
        self.deposit_count = 1;
        self.state = PeriodState::Open;
        info!(period = %period_header_ref, "commit period opened");
    }

    /// Close the current period; deposits are rejected until the next
    /// [`open_period`](Self::open_period).
    pub fn finalize_period(&mut self) {
        self.state = PeriodState::Closed;
        info!(period = %self.period_header_ref, deposits = self.deposit_count - 1, "commit period finalized");
    }

    /// Allocate a deposit slot for a verified fact.
    ///
    /// Checks, in order, with no mutation until all pass: the period is
    /// open, the owner passes the account policy, the amount is nonzero,
    /// the token is mapped, the source transaction has not been consumed
    /// before (the primary replay-prevention invariant), and the period
    /// has capacity. On success the slot id is
    /// `period_header_ref - interval + deposit_count`, which encodes both
    /// the period and the position within it.
    pub fn create_deposit(
        &mut self,
        fact: &DepositFact,
        now: u64,
        classifier: &dyn AccountClassifier,
        registry: &dyn TokenRegistry,
    ) -> Result<U256, LedgerError> {
        if self.state == PeriodState::Closed {
            return Err(LedgerError::PeriodClosed);
        }
        let owner = fact.owner();
        if !classifier.is_simple_account(&owner) {
            return Err(LedgerError::NonAccountOwner { owner });
        }
        if fact.amount().is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let token = fact.token();
        if !registry.is_token_mapped(&token) {
            return Err(LedgerError::TokenNotMapped { token });
        }
        if self.consumed.contains(&fact.source_tx_digest()) {
            return Err(LedgerError::ReplayedProof {
                source_tx: hex::encode(fact.source_tx_digest()),
            });
        }
        if self.deposit_count >= self.interval {
            return Err(LedgerError::PeriodFull {
                capacity: self.interval - 1,
            });
        }

        let slot_id = self
            .period_header_ref
            .wrapping_sub(U256::from(self.interval))
            .wrapping_add(U256::from(self.deposit_count));
        self.slots.insert(
            slot_id,
            DepositSlot {
                period_header_ref: self.period_header_ref,
                owner,
                token,
                amount: fact.amount(),
                created_at: now,
            },
        );
        self.consumed.insert(fact.source_tx_digest());
        self.deposit_count += 1;
        debug!(slot = %slot_id, %owner, %token, amount = %fact.amount(), "deposit slot created");
        Ok(slot_id)
    }

    /// Look up an allocated slot by id.
    pub fn slot(&self, slot_id: &U256) -> Option<&DepositSlot> {
        self.slots.get(slot_id)
    }

    /// The next position to be allocated in the current period (1-based;
    /// resets to 1 on rollover).
    pub fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    pub fn period_state(&self) -> PeriodState {
        self.state
    }

    pub fn period_header_ref(&self) -> U256 {
        self.period_header_ref
    }

    /// Whether a source transaction digest has already been credited.
    pub fn is_consumed(&self, source_tx_digest: &[u8; 32]) -> bool {
        self.consumed.contains(source_tx_digest)
    }

    /// Slots admitted per period.
    pub fn capacity(&self) -> u64 {
        self.interval.saturating_sub(1)
    }
}
