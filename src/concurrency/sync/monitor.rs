//! `Monitor` — a mutex-protected state paired with a condition variable.
//!
//! Every blocking primitive in this crate is a small state machine living
//! inside a `Monitor`. A thread enters the monitor, inspects the state, and
//! either mutates it or blocks on the condition variable until another thread
//! changes the state and notifies. Waits always re-check their predicate after
//! waking, so spurious and grouped wake-ups are harmless.
//!
//! # Interrupts
//!
//! Rust threads have no built-in interrupt flag, so the monitor keeps one per
//! thread. [`Monitor::interrupt`] posts a pending interrupt for a thread and
//! wakes every waiter; the target observes it the next time it *blocks* in
//! [`MonitorGuard::wait_while_interruptibly`], which then returns
//! [`Interrupted`] without having touched the protected state. Non-interruptible
//! waits ignore pending interrupts and leave them in place.

use crate::error::Interrupted;
use core::ops::{Deref, DerefMut};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

struct Slot<S> {
    state: S,
    /// Threads with an interrupt that has not been consumed yet.
    interrupts: Vec<ThreadId>,
}

impl<S> Slot<S> {
    fn take_interrupt(&mut self, thread: ThreadId) -> bool {
        match self.interrupts.iter().position(|t| *t == thread) {
            Some(i) => {
                self.interrupts.swap_remove(i);
                true
            }
            None => false,
        }
    }
}

/// A state `S` protected by one lock and one condition variable.
pub struct Monitor<S> {
    slot: Mutex<Slot<S>>,
    cond: Condvar,
}

impl<S: Default> Default for Monitor<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Monitor<S> {
    /// Creates a monitor around `state`.
    pub fn new(state: S) -> Self {
        Self {
            slot: Mutex::new(Slot {
                state,
                interrupts: Vec::new(),
            }),
            cond: Condvar::new(),
        }
    }

    /// Enters the monitor, blocking until its lock is available.
    pub fn enter(&self) -> MonitorGuard<'_, S> {
        MonitorGuard {
            monitor: self,
            slot: self.slot.lock(),
        }
    }

    /// Posts an interrupt for `thread` and wakes all waiters so it can notice.
    ///
    /// Interrupting a thread that is not waiting leaves the interrupt pending
    /// until that thread's next interruptible wait on this monitor. An entry is
    /// only removed when its thread consumes it, either by blocking in an
    /// interruptible wait or by calling [`clear_interrupt`](Self::clear_interrupt).
    /// An interrupt aimed at a thread that never does either stays recorded for
    /// the life of the monitor; at most one entry is kept per thread.
    pub fn interrupt(&self, thread: ThreadId) {
        let mut slot = self.slot.lock();
        if !slot.interrupts.contains(&thread) {
            slot.interrupts.push(thread);
        }
        drop(slot);
        tracing::debug!(?thread, "interrupt posted");
        self.cond.notify_all();
    }

    /// Clears a pending interrupt for the calling thread, returning whether one was set.
    pub fn clear_interrupt(&self) -> bool {
        self.slot.lock().take_interrupt(thread::current().id())
    }

    /// Number of posted interrupts not yet consumed.
    pub fn pending_interrupts(&self) -> usize {
        self.slot.lock().interrupts.len()
    }

    /// Consumes the monitor and returns the protected state.
    pub fn into_inner(self) -> S {
        self.slot.into_inner().state
    }

    /// Exclusive access without locking; the borrow checker proves no other user exists.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.slot.get_mut().state
    }
}

/// Proof of being inside a [`Monitor`]; dereferences to the protected state.
pub struct MonitorGuard<'a, S> {
    monitor: &'a Monitor<S>,
    slot: MutexGuard<'a, Slot<S>>,
}

impl<'a, S> MonitorGuard<'a, S> {
    /// Blocks while `blocked` holds, releasing the monitor during each wait.
    pub fn wait_while(&mut self, mut blocked: impl FnMut(&S) -> bool) {
        while blocked(&self.slot.state) {
            self.monitor.cond.wait(&mut self.slot);
        }
    }

    /// Like [`wait_while`](Self::wait_while) but gives up after `timeout`.
    ///
    /// Returns `true` if the predicate cleared, `false` if the wait timed out
    /// with the predicate still blocking.
    pub fn wait_while_for(&mut self, mut blocked: impl FnMut(&S) -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while blocked(&self.slot.state) {
            if self.monitor.cond.wait_until(&mut self.slot, deadline).timed_out() {
                return !blocked(&self.slot.state);
            }
        }
        true
    }

    /// Blocks while `blocked` holds, abandoning the wait if the calling thread
    /// is interrupted.
    ///
    /// The predicate is evaluated before the interrupt flag, so a thread whose
    /// condition is already satisfied proceeds and keeps its interrupt pending.
    pub fn wait_while_interruptibly(&mut self, mut blocked: impl FnMut(&S) -> bool) -> Result<(), Interrupted> {
        let me = thread::current().id();
        while blocked(&self.slot.state) {
            if self.slot.take_interrupt(me) {
                return Err(Interrupted);
            }
            self.monitor.cond.wait(&mut self.slot);
        }
        Ok(())
    }

    /// Wakes one waiter.
    pub fn notify_one(&self) {
        self.monitor.cond.notify_one();
    }

    /// Wakes every waiter.
    pub fn notify_all(&self) {
        self.monitor.cond.notify_all();
    }
}

impl<S> Deref for MonitorGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.slot.state
    }
}

impl<S> DerefMut for MonitorGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.slot.state
    }
}
