//! Transfers between accounts that each carry their own lock.
//!
//! A transfer must hold both account locks at once. Taking them in call order
//! ("lock `from`, then `to`") lets two opposite transfers between the same pair
//! each hold one lock and wait forever for the other. [`LockOrdering::ById`]
//! always takes the lower account ID first, so every thread climbs the same
//! ladder and no cycle of waiters can form.
//!
//! [`LockOrdering::CallerOrder`] is the naive order. It exists so the deadlock
//! can be reproduced next to the fix; do not use it for real transfers.
//!
//! Balances are read and written only under their account's lock. Inside a
//! transfer the balance helpers re-enter locks the transfer already holds.
//! Log events are emitted after both locks are released.

use crate::concurrency::sync::ReentrantMutex;
use crate::error::TransferError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::Arc;

/// Identity of an account; also its position in the global lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A balance guarded by its own reentrant lock.
pub struct Account {
    id: AccountId,
    balance: ReentrantMutex<Cell<i64>>,
}

impl Account {
    /// Opens an account.
    ///
    /// # Panics
    ///
    /// If `opening_balance` is negative.
    pub fn new(id: AccountId, opening_balance: i64) -> Self {
        assert!(opening_balance >= 0, "account {id} opened with negative balance {opening_balance}");
        Self {
            id,
            balance: ReentrantMutex::new(Cell::new(opening_balance)),
        }
    }

    /// The account's identity.
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// The balance, read under the account lock.
    pub fn balance(&self) -> i64 {
        self.balance.lock().get()
    }

    /// The account lock.
    pub fn lock(&self) -> &ReentrantMutex<Cell<i64>> {
        &self.balance
    }

    /// Adds `amount` and returns the new balance.
    ///
    /// A deposit that would overflow the balance is rejected unchanged.
    pub fn deposit(&self, amount: i64) -> Result<i64, TransferError> {
        if amount <= 0 {
            return Err(TransferError::NonPositiveAmount(amount));
        }
        let balance = self.balance.lock();
        let credited = self.credited(balance.get(), amount)?;
        balance.set(credited);
        Ok(credited)
    }

    fn credited(&self, current: i64, amount: i64) -> Result<i64, TransferError> {
        current.checked_add(amount).ok_or(TransferError::BalanceOverflow {
            account: self.id,
            balance: current,
            requested: amount,
        })
    }

    /// Removes `amount` if the balance covers it and returns the new balance.
    ///
    /// The check and the deduction happen under one hold of the lock.
    pub fn withdraw(&self, amount: i64) -> Result<i64, TransferError> {
        if amount <= 0 {
            return Err(TransferError::NonPositiveAmount(amount));
        }
        let balance = self.balance.lock();
        let current = balance.get();
        if current < amount {
            return Err(TransferError::InsufficientFunds {
                account: self.id,
                balance: current,
                requested: amount,
            });
        }
        balance.set(current - amount);
        Ok(balance.get())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("balance", &self.balance())
            .finish()
    }
}

/// The order in which a transfer takes its two account locks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockOrdering {
    /// Lower account ID first, regardless of direction.
    #[default]
    ById,
    /// `from` first, then `to`. Deadlock-prone.
    CallerOrder,
}

/// Outcome of a committed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Debited account.
    pub from: AccountId,
    /// Credited account.
    pub to: AccountId,
    /// Amount moved.
    pub amount: i64,
    /// Debited account's balance after the transfer.
    pub from_balance: i64,
    /// Credited account's balance after the transfer.
    pub to_balance: i64,
}

/// A fixed set of accounts and the transfer protocol over them.
pub struct Bank {
    accounts: Vec<Arc<Account>>,
    ordering: LockOrdering,
}

impl Bank {
    /// Creates a bank using [`LockOrdering::ById`].
    ///
    /// # Panics
    ///
    /// If two accounts share an ID; the lock order would be ambiguous.
    pub fn new(accounts: Vec<Account>) -> Self {
        Self::with_ordering(accounts, LockOrdering::ById)
    }

    /// Creates a bank using the given lock order.
    ///
    /// # Panics
    ///
    /// If two accounts share an ID.
    pub fn with_ordering(accounts: Vec<Account>, ordering: LockOrdering) -> Self {
        let mut ids: Vec<AccountId> = accounts.iter().map(Account::id).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            panic!("duplicate account id {}", pair[0]);
        }
        Self {
            accounts: accounts.into_iter().map(Arc::new).collect(),
            ordering,
        }
    }

    /// Opens accounts `#1..=#n` with the given balances.
    pub fn with_balances(balances: &[i64]) -> Self {
        Self::new(
            (1..)
                .zip(balances)
                .map(|(id, &balance)| Account::new(AccountId(id), balance))
                .collect(),
        )
    }

    /// Switches the lock order used by later transfers.
    #[must_use]
    pub fn ordered_by(mut self, ordering: LockOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// All accounts in opening order.
    pub fn accounts(&self) -> &[Arc<Account>] {
        &self.accounts
    }

    /// Looks an account up by ID.
    pub fn account(&self, id: AccountId) -> Option<&Arc<Account>> {
        self.accounts.iter().find(|a| a.id() == id)
    }

    /// The lock order in use.
    pub fn ordering(&self) -> LockOrdering {
        self.ordering
    }

    /// The two accounts in the order this bank locks them.
    pub fn acquisition_order<'a>(&self, from: &'a Account, to: &'a Account) -> [&'a Account; 2] {
        match self.ordering {
            LockOrdering::CallerOrder => [from, to],
            LockOrdering::ById if from.id() <= to.id() => [from, to],
            LockOrdering::ById => [to, from],
        }
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Invalid requests are rejected before any lock is taken. The funds and
    /// overflow checks run with both locks held before either balance moves,
    /// so a rejected transfer changes nothing.
    pub fn transfer(&self, from: &Account, to: &Account, amount: i64) -> Result<Receipt, TransferError> {
        if amount <= 0 {
            return Err(TransferError::NonPositiveAmount(amount));
        }
        if from.id() == to.id() {
            return Err(TransferError::SelfTransfer(from.id()));
        }

        let [first, second] = self.acquisition_order(from, to);
        let first_guard = first.lock().lock();
        let second_guard = second.lock().lock();

        let outcome = to
            .credited(to.balance(), amount)
            .and_then(|_| from.withdraw(amount))
            .and_then(|from_balance| {
                let to_balance = to.deposit(amount)?;
                Ok(Receipt {
                    from: from.id(),
                    to: to.id(),
                    amount,
                    from_balance,
                    to_balance,
                })
            });

        drop(second_guard);
        drop(first_guard);

        match &outcome {
            Ok(receipt) => tracing::debug!(
                from = %receipt.from,
                to = %receipt.to,
                amount,
                "transfer committed"
            ),
            Err(err) => tracing::debug!(from = %from.id(), to = %to.id(), amount, %err, "transfer rejected"),
        }
        outcome
    }

    /// Transfers between accounts looked up by ID.
    ///
    /// Returns `None` if either ID is unknown.
    pub fn transfer_by_id(&self, from: AccountId, to: AccountId, amount: i64) -> Option<Result<Receipt, TransferError>> {
        let from = self.account(from)?;
        let to = self.account(to)?;
        Some(self.transfer(from, to, amount))
    }

    /// Sum of all balances, reading one account lock at a time.
    pub fn total(&self) -> i64 {
        self.accounts.iter().map(|a| a.balance()).sum()
    }
}

/// Balances observed by an [`Auditor`] pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Each account's balance as read under its own lock.
    pub balances: Vec<(AccountId, i64)>,
    /// Sum of `balances`.
    pub total: i64,
}

/// Reads balances concurrently with transfers.
///
/// Each account is read under its own lock, one at a time, so a report taken
/// while transfers run can straddle a transfer. Only quiescent reports are
/// guaranteed to add up to the bank's total.
pub struct Auditor<'a> {
    bank: &'a Bank,
}

impl<'a> Auditor<'a> {
    /// Creates an auditor for `bank`.
    pub fn new(bank: &'a Bank) -> Self {
        Self { bank }
    }

    /// Takes one pass over the accounts.
    pub fn audit(&self) -> AuditReport {
        let balances: Vec<(AccountId, i64)> = self.bank.accounts().iter().map(|a| (a.id(), a.balance())).collect();
        let total = balances.iter().map(|(_, b)| b).sum();
        tracing::trace!(accounts = balances.len(), total, "audit pass");
        AuditReport { balances, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_leave_balances() {
        let bank = Bank::with_balances(&[100, 200]);
        let (a, b) = (&bank.accounts()[0], &bank.accounts()[1]);

        assert_eq!(bank.transfer(a, b, 0), Err(TransferError::NonPositiveAmount(0)));
        assert_eq!(bank.transfer(a, b, -5), Err(TransferError::NonPositiveAmount(-5)));
        assert_eq!(bank.transfer(a, a, 10), Err(TransferError::SelfTransfer(AccountId(1))));
        assert_eq!(
            bank.transfer(a, b, 101),
            Err(TransferError::InsufficientFunds {
                account: AccountId(1),
                balance: 100,
                requested: 101
            })
        );
        assert_eq!((a.balance(), b.balance()), (100, 200));
        assert!(!a.lock().is_locked());
        assert!(!b.lock().is_locked());
    }

    #[test]
    fn test_overflowing_credit_is_rejected_whole() {
        let bank = Bank::with_balances(&[i64::MAX, 1]);
        let (a, b) = (&bank.accounts()[0], &bank.accounts()[1]);

        assert_eq!(
            bank.transfer(b, a, 1),
            Err(TransferError::BalanceOverflow {
                account: AccountId(1),
                balance: i64::MAX,
                requested: 1
            })
        );
        assert_eq!((a.balance(), b.balance()), (i64::MAX, 1));
        assert!(!a.lock().is_locked());
        assert!(!b.lock().is_locked());

        // The other direction still goes through.
        assert_eq!(bank.transfer(a, b, 1).unwrap().to_balance, 2);
    }

    #[test]
    fn test_account_deposit_and_withdraw() {
        let account = Account::new(AccountId(3), 10);

        assert_eq!(account.deposit(0), Err(TransferError::NonPositiveAmount(0)));
        assert_eq!(account.withdraw(-1), Err(TransferError::NonPositiveAmount(-1)));
        assert_eq!(account.deposit(5), Ok(15));
        assert_eq!(account.withdraw(15), Ok(0));
        assert_eq!(
            account.withdraw(1),
            Err(TransferError::InsufficientFunds {
                account: AccountId(3),
                balance: 0,
                requested: 1
            })
        );

        account.deposit(i64::MAX).unwrap();
        assert_eq!(
            account.deposit(1),
            Err(TransferError::BalanceOverflow {
                account: AccountId(3),
                balance: i64::MAX,
                requested: 1
            })
        );
        assert_eq!(account.balance(), i64::MAX);
        assert!(!account.lock().is_locked());
    }

    #[test]
    fn test_transfer_moves_funds() {
        let bank = Bank::with_balances(&[100, 200]);
        let receipt = bank.transfer_by_id(AccountId(2), AccountId(1), 150).unwrap().unwrap();
        assert_eq!(receipt.from_balance, 50);
        assert_eq!(receipt.to_balance, 250);
        assert_eq!(bank.total(), 300);
        assert!(bank.transfer_by_id(AccountId(9), AccountId(1), 1).is_none());
    }

    #[test]
    fn test_acquisition_order() {
        let bank = Bank::with_balances(&[1, 1]);
        let (a, b) = (&*bank.accounts()[0], &*bank.accounts()[1]);
        let ids = |pair: [&Account; 2]| [pair[0].id(), pair[1].id()];

        assert_eq!(ids(bank.acquisition_order(b, a)), [AccountId(1), AccountId(2)]);
        let bank = bank.ordered_by(LockOrdering::CallerOrder);
        let (a, b) = (&*bank.accounts()[0], &*bank.accounts()[1]);
        assert_eq!(ids(bank.acquisition_order(b, a)), [AccountId(2), AccountId(1)]);
    }

    #[test]
    #[should_panic(expected = "duplicate account id")]
    fn test_duplicate_ids_rejected() {
        Bank::new(vec![Account::new(AccountId(1), 0), Account::new(AccountId(1), 0)]);
    }

    #[test]
    fn test_audit_report_serializes() {
        let bank = Bank::with_balances(&[100, 200, 300, 400]);
        let report = Auditor::new(&bank).audit();
        assert_eq!(report.total, 1000);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 1000);
        assert_eq!(json["balances"][0], serde_json::json!([1, 100]));
    }
}
