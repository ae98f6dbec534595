//! # `concord` - Monitor-Based Synchronization Toolkit
//!
//! Blocking synchronization primitives built from one idea, the monitor (a
//! lock plus a condition variable around a small state machine), and a set of
//! case studies showing how multi-lock code stays deadlock-free.
//!
//! ## Primitives
//!
//! - **`ReentrantMutex<T>`**: an owner-tracking lock its holder may re-enter.
//!   Releasing it from the wrong thread, or when nobody holds it, is reported
//!   as a [`LockError`] instead of corrupting the lock.
//! - **`ReaderWriterLock`**: many readers or one writer, with a
//!   [`FairnessPolicy`]. `Fair` stops admitting new readers once a writer is
//!   waiting; `Unfair` admits readers whenever no writer holds the lock.
//!   Writes can be made reentrant.
//! - **`Monitor<S>`**: the building block itself, with predicate waits, timed
//!   waits and per-thread interrupts.
//!
//! ## Disciplines
//!
//! 1. **Hand-over-hand locking** ([`FineGrainedSortedList`]): a walker never
//!    releases a node before it holds the next one, and locks are always taken
//!    head to tail, so concurrent inserts cannot deadlock.
//! 2. **Global lock order** ([`Bank`], [`DiningTable`]): every operation that
//!    needs two locks takes them in one fixed order, so the wait-for graph has
//!    no cycle.
//! 3. **Open calls** ([`Movie`], [`Theater`]): never call into another object
//!    while holding your own lock.
//!
//! The naive alternatives (caller order, left-then-right) are kept as policies
//! so tests can reproduce the deadlocks they cause.
//!
//! ## Example
//!
//! ```rust
//! use concord::Bank;
//!
//! let bank = Bank::with_balances(&[100, 200, 300, 400]);
//! let (a, b) = (&bank.accounts()[0], &bank.accounts()[1]);
//!
//! bank.transfer(a, b, 100).unwrap();
//! assert_eq!(a.balance(), 0);
//! assert_eq!(b.balance(), 300);
//! assert!(bank.transfer(a, b, 1).is_err());
//! assert_eq!(bank.total(), 1_000);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod collections;
pub mod concurrency;
pub mod coordination;
pub mod error;

pub use collections::FineGrainedSortedList;
pub use concurrency::patterns::{Doorbell, Sequencer, SumPool, TurnBoard};
pub use concurrency::sync::{
    FairnessPolicy,
    Monitor,
    ReaderWriterLock,
    ReentrantMutex,
    ReentrantMutexGuard,
    RwStore,
};
pub use concurrency::{run_workers, HarnessConfig};
pub use coordination::{AccountId, Bank, DiningTable, Movie, Philosopher, Theater};
pub use error::{Interrupted, LockError, TransferError, TurnError};
