//! `RwStore` — a value behind a [`ReaderWriterLock`].

use super::rwlock::{FairnessPolicy, ReaderWriterLock, RwSnapshot};
use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

/// A value shared by readers and writers through a [`ReaderWriterLock`].
pub struct RwStore<T> {
    lock: ReaderWriterLock,
    value: UnsafeCell<T>,
}

// Safety: readers share `&T` (needs `Sync`), writers move exclusive access
// between threads (needs `Send`); the lock enforces the exclusion.
unsafe impl<T: Send> Send for RwStore<T> {}
unsafe impl<T: Send + Sync> Sync for RwStore<T> {}

impl<T> RwStore<T> {
    /// Wraps `value` in a lock with the given policy.
    pub fn new(value: T, policy: FairnessPolicy) -> Self {
        Self::with_lock(value, ReaderWriterLock::new(policy))
    }

    /// Wraps `value` in a caller-configured lock.
    ///
    /// # Panics
    ///
    /// If `lock` is held; the store owns its lock from the start.
    pub fn with_lock(value: T, lock: ReaderWriterLock) -> Self {
        let s = lock.snapshot();
        assert!(
            s.read_count == 0 && s.write_count == 0,
            "RwStore needs an unheld lock, got {s:?}"
        );
        Self {
            lock,
            value: UnsafeCell::new(value),
        }
    }

    /// The reader admission policy.
    pub fn policy(&self) -> FairnessPolicy {
        self.lock.policy()
    }

    /// Counters of the underlying lock.
    pub fn snapshot(&self) -> RwSnapshot {
        self.lock.snapshot()
    }

    /// Enters the read side.
    pub fn read(&self) -> StoreReadGuard<'_, T> {
        self.lock.lock_read();
        StoreReadGuard {
            store: self,
            _not_send: PhantomData,
        }
    }

    /// Enters the write side.
    ///
    /// # Panics
    ///
    /// If the calling thread already holds the write side: a second guard
    /// would alias the first one's `&mut T`.
    pub fn write(&self) -> StoreWriteGuard<'_, T> {
        assert!(
            !self.lock.is_write_held_by_current_thread(),
            "nested write guard would alias the value"
        );
        self.lock.lock_write();
        StoreWriteGuard {
            store: self,
            _not_send: PhantomData,
        }
    }

    /// Consumes the store and returns the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

/// Shared access to an [`RwStore`] value.
pub struct StoreReadGuard<'a, T> {
    store: &'a RwStore<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for StoreReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the read side is held, so no writer is inside.
        unsafe { &*self.store.value.get() }
    }
}

impl<T> Drop for StoreReadGuard<'_, T> {
    fn drop(&mut self) {
        self.store.lock.unlock_read();
    }
}

/// Exclusive access to an [`RwStore`] value.
pub struct StoreWriteGuard<'a, T> {
    store: &'a RwStore<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for StoreWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write side is held by this thread.
        unsafe { &*self.store.value.get() }
    }
}

impl<T> DerefMut for StoreWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write side is held by this thread and no other guard aliases it.
        unsafe { &mut *self.store.value.get() }
    }
}

impl<T> Drop for StoreWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.store.lock.unlock_write();
    }
}
