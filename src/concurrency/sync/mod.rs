//! Blocking synchronization primitives built on monitors.
//!
//! Everything here reduces to one [`Monitor`]: a `parking_lot` mutex around a
//! small state machine plus a condition variable. Threads block only inside
//! the monitor's waits, never in a spin loop.

pub mod monitor;
pub mod reentrant_mutex;
pub mod rw_store;
pub mod rwlock;

pub use monitor::{Monitor, MonitorGuard};
pub use reentrant_mutex::{ReentrantMutex, ReentrantMutexGuard};
pub use rw_store::{RwStore, StoreReadGuard, StoreWriteGuard};
pub use rwlock::{FairnessPolicy, ReaderWriterLock, RwSnapshot};
