//! Multi-lock case studies and the disciplines that keep them deadlock-free.
//!
//! - `bank`: transfers lock two accounts in a global order by account ID.
//! - `dining`: philosophers take the lower-numbered chopstick first.
//! - `showtimes`: two mutually linked objects never call each other while
//!   holding their own lock (open calls).
//!
//! The naive orderings are kept as selectable policies so tests can show the
//! deadlock they cause.

pub mod bank;
pub mod dining;
pub mod showtimes;

pub use bank::{Account, AccountId, AuditReport, Auditor, Bank, LockOrdering, Receipt};
pub use dining::{AcquisitionPolicy, Chopstick, DiningTable, Meal, Philosopher, PhilosopherState};
pub use showtimes::{Movie, Theater};
