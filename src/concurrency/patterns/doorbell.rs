//! `Doorbell` — wait/notify with a remembered signal.
//!
//! A bare condition-variable notify is lost if it happens before anyone
//! waits. The doorbell records the ring in its state, so `ring` followed by
//! `wait` returns at once, and a waiter consumes exactly one ring.
//!
//! # Nested monitor lockout
//!
//! Waiting on the doorbell releases only the doorbell's own lock. A thread
//! that holds some *outer* lock while it waits keeps that lock for the whole
//! wait; if the thread that would ring needs the outer lock first, neither can
//! proceed:
//!
//! ```text
//! waiter:   lock(outer) -> bell.wait()   ... holds outer, sleeps on bell
//! ringer:   lock(outer) -> bell.ring()   ... blocks on outer forever
//! ```
//!
//! Do not hold a lock across a wait on a different monitor. Either release the
//! outer lock before waiting, or let the ringer reach the doorbell without it,
//! or fold both into one monitor.

use crate::concurrency::sync::Monitor;
use crate::error::Interrupted;
use std::thread::ThreadId;
use std::time::Duration;

/// A one-ring-per-wait signal.
#[derive(Default)]
pub struct Doorbell {
    rung: Monitor<bool>,
}

impl Doorbell {
    /// Creates a silent doorbell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rings; the ring stays pending until a waiter consumes it.
    pub fn ring(&self) {
        let mut rung = self.rung.enter();
        *rung = true;
        rung.notify_one();
    }

    /// Blocks until rung, consuming the ring.
    pub fn wait(&self) {
        let mut rung = self.rung.enter();
        rung.wait_while(|r| !*r);
        *rung = false;
    }

    /// Waits up to `timeout`; returns whether a ring was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut rung = self.rung.enter();
        if rung.wait_while_for(|r| !*r, timeout) {
            *rung = false;
            true
        } else {
            false
        }
    }

    /// Interruptible form of [`wait`](Self::wait).
    pub fn wait_interruptibly(&self) -> Result<(), Interrupted> {
        let mut rung = self.rung.enter();
        rung.wait_while_interruptibly(|r| !*r)?;
        *rung = false;
        Ok(())
    }

    /// Posts an interrupt for `thread`; see [`Monitor::interrupt`].
    pub fn interrupt(&self, thread: ThreadId) {
        self.rung.interrupt(thread);
    }
}
