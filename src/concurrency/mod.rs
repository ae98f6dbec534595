//! Blocking primitives, coordination patterns and the worker harness.
//!
//! Every primitive here blocks inside a monitor wait instead of spinning, and
//! none of them retries or times out on its own. Bounded retries live in
//! [`harness`], on the caller's side.

pub mod harness;
pub mod patterns;
pub mod sync;

pub use harness::{run_workers, try_acquire_for, try_lock_for, HarnessConfig, RunBound, WorkerContext};
