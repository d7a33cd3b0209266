//! Fungible balances and custodied stakes.
//!
//! `Stake` is the custody object the escrow holds: an owned, non-clonable
//! amount of raw token units. It can only be created by withdrawing from a
//! ledger account, and is consumed exactly once — merged, split, or
//! deposited back to an account. Move semantics make double-spend a compile
//! error; a `Drop` hook flags any stake that leaks without being deposited.
//!
//! `InMemoryLedger` stands in for the chain's coin store. Balances are held
//! behind one mutex, so withdraw/deposit are atomic with respect to each
//! other.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, error};

use crate::types::{AccountId, EscrowError};

// ---------------------------------------------------------------------------
// Stake — linear custody of funds
// ---------------------------------------------------------------------------

/// Custodied funds. Not `Clone`, not `Copy`: once moved into a Match the
/// only ways out are `merge`, `split`, or a ledger deposit.
#[derive(Debug)]
pub struct Stake {
    amount: u64,
}

impl Stake {
    /// Only the ledger (this crate) mints custody objects.
    pub(crate) fn acquire(amount: u64) -> Self {
        Stake { amount }
    }

    /// Amount held, in raw token units.
    pub fn value(&self) -> u64 {
        self.amount
    }

    /// Combine two stakes into one.
    pub fn merge(self, other: Stake) -> Stake {
        let total = self.into_raw() + other.into_raw();
        Stake { amount: total }
    }

    /// Split off `amount`, returning `(split_off, remainder)`.
    /// On rejection the stake is handed back untouched.
    pub fn split(self, amount: u64) -> Result<(Stake, Stake), Rejected> {
        if amount > self.amount {
            let available = self.amount;
            return Err(Rejected {
                error: EscrowError::InsufficientBalance { needed: amount, available },
                stake: self,
            });
        }
        let total = self.into_raw();
        Ok((Stake { amount }, Stake { amount: total - amount }))
    }

    /// Consume the stake, disarming the leak check.
    fn into_raw(self) -> u64 {
        let amount = self.amount;
        std::mem::forget(self);
        amount
    }
}

/// A consuming operation that was rejected whole. The custody object comes
/// back with the error so the caller never loses funds to a failed call.
#[derive(Debug)]
pub struct Rejected {
    pub error: EscrowError,
    pub stake: Stake,
}

impl Drop for Stake {
    fn drop(&mut self) {
        // Every legitimate exit goes through `into_raw`. Reaching this drop
        // with a nonzero amount means custodied funds leaked.
        if self.amount > 0 {
            error!(amount = self.amount, "custodied stake dropped without being transferred");
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The fund primitives the escrow engine depends on.
pub trait Ledger: Send + Sync {
    /// Move `amount` out of `account` into a custody object.
    fn withdraw(&self, account: &AccountId, amount: u64) -> Result<Stake, EscrowError>;

    /// Transfer custodied funds to `recipient`'s balance. Infallible:
    /// deposits create the account if it does not exist.
    fn deposit(&self, stake: Stake, recipient: &AccountId);
}

/// Mutex-guarded account balances. Stands in for the chain's coin store in
/// tests and the demo service.
pub struct InMemoryLedger {
    balances: Mutex<HashMap<AccountId, u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        InMemoryLedger { balances: Mutex::new(HashMap::new()) }
    }

    /// Seed starting balances (config-driven in the demo binary).
    pub fn seeded(accounts: impl IntoIterator<Item = (AccountId, u64)>) -> Self {
        InMemoryLedger { balances: Mutex::new(accounts.into_iter().collect()) }
    }

    /// Current balance of an account (0 if unknown).
    pub fn balance(&self, account: &AccountId) -> u64 {
        let balances = self.balances.lock().expect("ledger lock poisoned");
        balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of all balances. Useful for conservation checks in tests.
    pub fn total_supply(&self) -> u64 {
        let balances = self.balances.lock().expect("ledger lock poisoned");
        balances.values().sum()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for InMemoryLedger {
    fn withdraw(&self, account: &AccountId, amount: u64) -> Result<Stake, EscrowError> {
        let mut balances = self.balances.lock().expect("ledger lock poisoned");
        let available = balances.get(account).copied().unwrap_or(0);
        if available < amount {
            return Err(EscrowError::InsufficientBalance { needed: amount, available });
        }
        balances.insert(account.clone(), available - amount);
        debug!(%account, amount, remaining = available - amount, "Withdrew stake");
        Ok(Stake::acquire(amount))
    }

    fn deposit(&self, stake: Stake, recipient: &AccountId) {
        let amount = stake.into_raw();
        let mut balances = self.balances.lock().expect("ledger lock poisoned");
        let entry = balances.entry(recipient.clone()).or_insert(0);
        *entry += amount;
        debug!(account = %recipient, amount, balance = *entry, "Deposited stake");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[test]
    fn test_withdraw_and_deposit() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 1000)]);
        let stake = ledger.withdraw(&acct("a"), 300).unwrap();
        assert_eq!(stake.value(), 300);
        assert_eq!(ledger.balance(&acct("a")), 700);

        ledger.deposit(stake, &acct("b"));
        assert_eq!(ledger.balance(&acct("b")), 300);
        assert_eq!(ledger.total_supply(), 1000);
    }

    #[test]
    fn test_withdraw_insufficient() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 100)]);
        let err = ledger.withdraw(&acct("a"), 500).unwrap_err();
        assert_eq!(err, EscrowError::InsufficientBalance { needed: 500, available: 100 });
        // Balance untouched on rejection.
        assert_eq!(ledger.balance(&acct("a")), 100);
    }

    #[test]
    fn test_withdraw_unknown_account() {
        let ledger = InMemoryLedger::new();
        let err = ledger.withdraw(&acct("ghost"), 1).unwrap_err();
        assert_eq!(err, EscrowError::InsufficientBalance { needed: 1, available: 0 });
    }

    #[test]
    fn test_deposit_creates_account() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 50)]);
        let stake = ledger.withdraw(&acct("a"), 50).unwrap();
        ledger.deposit(stake, &acct("new"));
        assert_eq!(ledger.balance(&acct("new")), 50);
    }

    #[test]
    fn test_merge() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 1000)]);
        let s1 = ledger.withdraw(&acct("a"), 500).unwrap();
        let s2 = ledger.withdraw(&acct("a"), 500).unwrap();
        let merged = s1.merge(s2);
        assert_eq!(merged.value(), 1000);
        ledger.deposit(merged, &acct("a"));
        assert_eq!(ledger.balance(&acct("a")), 1000);
    }

    #[test]
    fn test_split() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 1000)]);
        let stake = ledger.withdraw(&acct("a"), 1000).unwrap();
        let (part, rest) = stake.split(300).unwrap();
        assert_eq!(part.value(), 300);
        assert_eq!(rest.value(), 700);
        ledger.deposit(part, &acct("a"));
        ledger.deposit(rest, &acct("a"));
        assert_eq!(ledger.balance(&acct("a")), 1000);
    }

    #[test]
    fn test_split_too_much_hands_stake_back() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 100)]);
        let stake = ledger.withdraw(&acct("a"), 100).unwrap();
        let rejected = stake.split(200).unwrap_err();
        assert_eq!(
            rejected.error,
            EscrowError::InsufficientBalance { needed: 200, available: 100 }
        );
        assert_eq!(rejected.stake.value(), 100);
        ledger.deposit(rejected.stake, &acct("a"));
        assert_eq!(ledger.balance(&acct("a")), 100);
    }

    #[test]
    fn test_conservation_across_operations() {
        let ledger = InMemoryLedger::seeded([(acct("a"), 600), (acct("b"), 400)]);
        let sa = ledger.withdraw(&acct("a"), 250).unwrap();
        let sb = ledger.withdraw(&acct("b"), 250).unwrap();
        let pot = sa.merge(sb);
        ledger.deposit(pot, &acct("b"));
        assert_eq!(ledger.total_supply(), 1000);
        assert_eq!(ledger.balance(&acct("a")), 350);
        assert_eq!(ledger.balance(&acct("b")), 650);
    }
}
