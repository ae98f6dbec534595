//! Error types shared by the primitives and the case studies.

use crate::coordination::bank::AccountId;
use core::fmt;

/// Misuse of a lock's release path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The calling thread is not the current holder.
    NotOwner,
    /// The lock is not held by anyone.
    NotLocked,
    /// The caller's remaining hold levels belong to live guards; drop them instead.
    GuardedHold,
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOwner => f.write_str("current thread does not hold the lock and cannot release it"),
            Self::NotLocked => f.write_str("lock is not currently held, cannot release it"),
            Self::GuardedHold => f.write_str("remaining hold levels belong to live guards, cannot release them raw"),
        }
    }
}

impl std::error::Error for LockError {}

/// A blocking wait was abandoned because the waiting thread was interrupted.
///
/// No lock state is changed by an interrupted wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("blocking wait interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Reasons a transfer was rejected. No balance is modified in any of these cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// The requested amount was zero or negative.
    NonPositiveAmount(i64),
    /// Source and destination are the same account.
    SelfTransfer(AccountId),
    /// The source account cannot cover the amount.
    InsufficientFunds {
        /// Account that would have been debited.
        account: AccountId,
        /// Its balance at the time of the check.
        balance: i64,
        /// The amount requested.
        requested: i64,
    },
    /// Crediting the amount would overflow the destination balance.
    BalanceOverflow {
        /// Account that would have been credited.
        account: AccountId,
        /// Its balance at the time of the check.
        balance: i64,
        /// The amount requested.
        requested: i64,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => write!(f, "transfer amount must be positive, got {amount}"),
            Self::SelfTransfer(id) => write!(f, "cannot transfer from account {id} to itself"),
            Self::InsufficientFunds { account, balance, requested } => write!(
                f,
                "insufficient funds in account {account}: balance {balance}, requested {requested}"
            ),
            Self::BalanceOverflow { account, balance, requested } => write!(
                f,
                "crediting account {account} would overflow: balance {balance}, requested {requested}"
            ),
        }
    }
}

impl std::error::Error for TransferError {}

/// Returned when a participant tries to advance a turn it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    /// The board is showing a different ticket.
    NotYourTurn {
        /// Ticket presented by the caller.
        ticket: u64,
        /// Ticket currently served.
        current: u64,
    },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYourTurn { ticket, current } => {
                write!(f, "ticket {ticket} cannot advance the board while serving {current}")
            }
        }
    }
}

impl std::error::Error for TurnError {}
