//! `ReentrantMutex` — a lock its holder may re-enter.
//!
//! The lock is a monitor over `{ holder, hold_count }`:
//!
//! - `hold_count > 0` exactly when the lock is held;
//! - `holder` is `None` exactly when `hold_count == 0`.
//!
//! `acquire` admits the caller when the lock is free or already held by the
//! caller, and otherwise blocks on the monitor (no spinning). `release`
//! decrements the count and, on reaching zero, clears the holder and wakes a
//! single waiter. Which waiter wins the lock next is unspecified.
//!
//! Re-entry is what lets the hand-over-hand list and the bank peek at data
//! under a lock they already hold through the raw `acquire` protocol.
//!
//! Hold levels taken by guards are counted separately. A raw `release` may
//! only give back levels taken by a raw `acquire`; the levels backing live
//! guards are released by dropping the guards, so no `&T` outlives the hold.

use super::monitor::Monitor;
use crate::error::{Interrupted, LockError};
use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::Deref;
use std::thread::{self, ThreadId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LockState {
    holder: Option<ThreadId>,
    hold_count: u32,
    /// Levels of `hold_count` owned by live guards.
    guarded: u32,
}

impl LockState {
    #[inline]
    fn admits(&self, thread: ThreadId) -> bool {
        self.holder.map_or(true, |h| h == thread)
    }

    #[inline]
    fn enter(&mut self, thread: ThreadId) {
        debug_assert!(self.admits(thread));
        self.holder = Some(thread);
        self.hold_count += 1;
    }

    /// Drops one level; returns `true` if the lock became free.
    #[inline]
    fn leave(&mut self) -> bool {
        self.hold_count -= 1;
        if self.hold_count == 0 {
            self.holder = None;
            true
        } else {
            false
        }
    }
}

/// A reentrant mutual-exclusion lock guarding a `T`.
///
/// Guards hand out `&T` only: the same thread may hold several guards at once,
/// so exclusive references would alias. Use a `Cell`/`RefCell` inside for
/// mutation.
pub struct ReentrantMutex<T> {
    monitor: Monitor<LockState>,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by the monitor; only the holder
// thread ever dereferences it.
unsafe impl<T: Send> Send for ReentrantMutex<T> {}
unsafe impl<T: Send> Sync for ReentrantMutex<T> {}

impl<T: Default> Default for ReentrantMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ReentrantMutex<T> {
    /// Creates an unlocked mutex.
    pub fn new(value: T) -> Self {
        Self {
            monitor: Monitor::new(LockState::default()),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, blocking until it is free or already ours.
    pub fn acquire(&self) {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        state.wait_while(|s| !s.admits(me));
        state.enter(me);
    }

    /// Acquires the lock unless the calling thread is interrupted while blocked.
    ///
    /// On `Err` the lock state is exactly as it was before the call.
    pub fn acquire_interruptibly(&self) -> Result<(), Interrupted> {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        state.wait_while_interruptibly(|s| !s.admits(me))?;
        state.enter(me);
        Ok(())
    }

    /// Acquires the lock only if that needs no waiting.
    pub fn try_acquire(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        if state.admits(me) {
            state.enter(me);
            true
        } else {
            false
        }
    }

    /// Releases one level taken by [`acquire`](Self::acquire) or [`try_acquire`](Self::try_acquire).
    ///
    /// Fails with [`LockError::NotLocked`] if nobody holds the lock, with
    /// [`LockError::NotOwner`] if another thread does, and with
    /// [`LockError::GuardedHold`] if every remaining level belongs to a live guard.
    pub fn release(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut state = self.monitor.enter();
        if state.hold_count == 0 {
            return Err(LockError::NotLocked);
        }
        if state.holder != Some(me) {
            return Err(LockError::NotOwner);
        }
        if state.hold_count == state.guarded {
            return Err(LockError::GuardedHold);
        }
        if state.leave() {
            state.notify_one();
        }
        Ok(())
    }

    /// Converts one raw level of the calling holder into a guarded one.
    fn guard(&self) -> ReentrantMutexGuard<'_, T> {
        let mut state = self.monitor.enter();
        debug_assert!(state.hold_count > state.guarded);
        state.guarded += 1;
        ReentrantMutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }

    fn release_guarded(&self) {
        let mut state = self.monitor.enter();
        debug_assert!(state.guarded > 0 && state.holder == Some(thread::current().id()));
        state.guarded -= 1;
        if state.leave() {
            state.notify_one();
        }
    }

    /// Posts an interrupt for `thread`; see [`Monitor::interrupt`].
    pub fn interrupt(&self, thread: ThreadId) {
        self.monitor.interrupt(thread);
    }

    /// Acquires the lock and returns a guard that releases it on drop.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, T> {
        self.acquire();
        self.guard()
    }

    /// Interruptible form of [`lock`](Self::lock).
    pub fn lock_interruptibly(&self) -> Result<ReentrantMutexGuard<'_, T>, Interrupted> {
        self.acquire_interruptibly()?;
        Ok(self.guard())
    }

    /// Non-blocking form of [`lock`](Self::lock).
    pub fn try_lock(&self) -> Option<ReentrantMutexGuard<'_, T>> {
        self.try_acquire().then(|| self.guard())
    }

    /// Whether any thread holds the lock right now.
    pub fn is_locked(&self) -> bool {
        self.monitor.enter().hold_count > 0
    }

    /// Whether the calling thread is the holder.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.monitor.enter().holder == Some(thread::current().id())
    }

    /// How many times the holder has entered the lock; zero when free.
    pub fn hold_count(&self) -> u32 {
        self.monitor.enter().hold_count
    }

    /// Exclusive access without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the mutex and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// RAII guard for [`ReentrantMutex`]; releases one hold level on drop.
///
/// Not `Send`: the release must come from the thread that acquired.
pub struct ReentrantMutexGuard<'a, T> {
    mutex: &'a ReentrantMutex<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for ReentrantMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while this thread holds the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> Drop for ReentrantMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.release_guarded();
    }
}
