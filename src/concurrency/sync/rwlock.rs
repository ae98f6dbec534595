//! `ReaderWriterLock` — many readers or one writer, under a selectable policy.
//!
//! Both policies share one state machine and differ only in when a reader is
//! admitted:
//!
//! | Policy                     | Reader blocks while                       | Writer blocks while                |
//! |----------------------------|-------------------------------------------|------------------------------------|
//! | [`FairnessPolicy::Unfair`] | `write_count > 0`                         | `read_count > 0 \|\| write_count > 0` |
//! | [`FairnessPolicy::Fair`]   | `write_count > 0 \|\| write_requests > 0` | `read_count > 0 \|\| write_count > 0` |
//!
//! Under `Unfair` a steady stream of overlapping readers keeps `read_count`
//! above zero forever and a writer never gets in. That writer starvation is a
//! property of the policy and is reproduced by the integration tests; it is
//! kept on purpose.
//!
//! Under `Fair` a writer registers a request before blocking, and pending
//! requests shut the door on new readers, so the writer only waits for the
//! readers already inside.
//!
//! With reentrant writes enabled, the thread recorded as write holder may call
//! `lock_write` again without blocking; only the outermost `unlock_write`
//! clears the holder and wakes waiters.
//!
//! Every unlock wakes all waiters because several readers may become eligible
//! at once. Unlocking a side that is not held panics.

use super::monitor::Monitor;
use crate::error::Interrupted;
use std::thread::{self, ThreadId};

/// Admission policy for readers while writers are waiting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FairnessPolicy {
    /// Pending writers block new readers.
    #[default]
    Fair,
    /// Readers are admitted whenever no writer is active; writers can starve.
    Unfair,
}

/// Counters of a [`ReaderWriterLock`] at one instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RwSnapshot {
    /// Readers inside.
    pub read_count: u32,
    /// 1 while a writer is inside, else 0.
    pub write_count: u32,
    /// Writers that announced themselves and are still waiting (fair policy only).
    pub write_requests: u32,
    /// Re-entry depth of the active writer.
    pub write_holds: u32,
    /// Thread holding the write side.
    pub write_holder: Option<ThreadId>,
}

/// A reader/writer lock built on a [`Monitor`].
///
/// This is a bare protocol lock; [`RwStore`](super::RwStore) pairs it with data.
pub struct ReaderWriterLock {
    monitor: Monitor<RwSnapshot>,
    policy: FairnessPolicy,
    reentrant_writes: bool,
}

impl Default for ReaderWriterLock {
    fn default() -> Self {
        Self::new(FairnessPolicy::default())
    }
}

impl ReaderWriterLock {
    /// Creates a lock with the given policy and non-reentrant writes.
    pub fn new(policy: FairnessPolicy) -> Self {
        Self {
            monitor: Monitor::new(RwSnapshot::default()),
            policy,
            reentrant_writes: false,
        }
    }

    /// Writer-preferring lock.
    pub fn fair() -> Self {
        Self::new(FairnessPolicy::Fair)
    }

    /// Writer-starvable lock.
    pub fn unfair() -> Self {
        Self::new(FairnessPolicy::Unfair)
    }

    /// Writer-preferring lock whose write side the holder may re-enter.
    pub fn reentrant() -> Self {
        Self::fair().with_reentrant_writes()
    }

    /// Allows the write holder to re-enter the write side.
    #[must_use]
    pub fn with_reentrant_writes(mut self) -> Self {
        self.reentrant_writes = true;
        self
    }

    /// The reader admission policy.
    pub fn policy(&self) -> FairnessPolicy {
        self.policy
    }

    /// Whether the write side is reentrant.
    pub fn is_reentrant(&self) -> bool {
        self.reentrant_writes
    }

    fn reader_blocked(&self, s: &RwSnapshot) -> bool {
        match self.policy {
            FairnessPolicy::Unfair => s.write_count > 0,
            FairnessPolicy::Fair => s.write_count > 0 || s.write_requests > 0,
        }
    }

    fn writer_blocked(s: &RwSnapshot) -> bool {
        s.read_count > 0 || s.write_count > 0
    }

    fn registers_requests(&self) -> bool {
        self.policy == FairnessPolicy::Fair
    }

    /// Enters the read side, blocking while the policy keeps readers out.
    ///
    /// # Panics
    ///
    /// If the calling thread holds the write side; waiting would never end.
    pub fn lock_read(&self) {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        assert_ne!(state.write_holder, Some(me), "write holder cannot take the read lock");
        state.wait_while(|s| self.reader_blocked(s));
        state.read_count += 1;
    }

    /// Interruptible form of [`lock_read`](Self::lock_read).
    pub fn lock_read_interruptibly(&self) -> Result<(), Interrupted> {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        assert_ne!(state.write_holder, Some(me), "write holder cannot take the read lock");
        state.wait_while_interruptibly(|s| self.reader_blocked(s))?;
        state.read_count += 1;
        Ok(())
    }

    /// Enters the read side if that needs no waiting.
    pub fn try_lock_read(&self) -> bool {
        let mut state = self.monitor.enter();
        if self.reader_blocked(&state) {
            return false;
        }
        state.read_count += 1;
        true
    }

    /// Leaves the read side and wakes all waiters.
    ///
    /// # Panics
    ///
    /// If no reader is inside.
    pub fn unlock_read(&self) {
        let mut state = self.monitor.enter();
        assert!(state.read_count > 0, "unlock_read called while no read lock is held");
        state.read_count -= 1;
        state.notify_all();
    }

    /// Returns `true` if the caller re-entered an existing write hold.
    fn try_reenter_write(&self, state: &mut RwSnapshot, me: ThreadId) -> bool {
        if state.write_holder != Some(me) {
            return false;
        }
        assert!(self.reentrant_writes, "write lock is not reentrant; the holder would wait for itself");
        state.write_holds += 1;
        true
    }

    fn admit_writer(&self, state: &mut RwSnapshot, me: ThreadId) {
        if self.registers_requests() {
            state.write_requests -= 1;
        }
        state.write_count = 1;
        state.write_holds = 1;
        state.write_holder = Some(me);
    }

    /// Enters the write side, blocking until no reader or writer is inside.
    ///
    /// # Panics
    ///
    /// If the caller already holds the write side and writes are not reentrant.
    pub fn lock_write(&self) {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        if self.try_reenter_write(&mut state, me) {
            return;
        }
        if self.registers_requests() {
            state.write_requests += 1;
        }
        state.wait_while(Self::writer_blocked);
        self.admit_writer(&mut state, me);
    }

    /// Interruptible form of [`lock_write`](Self::lock_write).
    ///
    /// An interrupted fair writer withdraws its request and wakes the readers
    /// it was holding back.
    pub fn lock_write_interruptibly(&self) -> Result<(), Interrupted> {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        if self.try_reenter_write(&mut state, me) {
            return Ok(());
        }
        if self.registers_requests() {
            state.write_requests += 1;
        }
        if let Err(interrupted) = state.wait_while_interruptibly(Self::writer_blocked) {
            if self.registers_requests() {
                state.write_requests -= 1;
                state.notify_all();
            }
            return Err(interrupted);
        }
        self.admit_writer(&mut state, me);
        Ok(())
    }

    /// Enters the write side if that needs no waiting.
    pub fn try_lock_write(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        if self.reentrant_writes && state.write_holder == Some(me) {
            state.write_holds += 1;
            return true;
        }
        if Self::writer_blocked(&state) {
            return false;
        }
        state.write_count = 1;
        state.write_holds = 1;
        state.write_holder = Some(me);
        true
    }

    /// Leaves one level of the write side; the outermost level wakes all waiters.
    ///
    /// # Panics
    ///
    /// If the write side is not held, or is held by another thread.
    pub fn unlock_write(&self) {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        assert!(state.write_count > 0, "unlock_write called while no write lock is held");
        assert_eq!(
            state.write_holder,
            Some(me),
            "unlock_write called by a thread that does not hold the write lock"
        );
        state.write_holds -= 1;
        if state.write_holds == 0 {
            state.write_count = 0;
            state.write_holder = None;
            state.notify_all();
        }
    }

    /// Whether the calling thread holds the write side.
    pub fn is_write_held_by_current_thread(&self) -> bool {
        self.monitor.enter().write_holder == Some(thread::current().id())
    }

    /// Posts an interrupt for `thread`; see [`Monitor::interrupt`].
    pub fn interrupt(&self, thread: ThreadId) {
        self.monitor.interrupt(thread);
    }

    /// Copies the current counters.
    pub fn snapshot(&self) -> RwSnapshot {
        *self.monitor.enter()
    }
}
