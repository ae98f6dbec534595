//! `SumPool` — workers pluck numbers from a shared list and add them to a shared sum.
//!
//! Taking the next item and adding it must happen under one hold of the lock.
//! If a worker plucked under the lock and added after releasing it, two workers
//! could read the same running sum and one addition would be lost. The list,
//! the cursor and the sum all live in one state owned by the pool, which is
//! passed to each worker by reference.

use crate::concurrency::sync::Monitor;
use std::thread;

struct Pool {
    items: Vec<i64>,
    next: usize,
    sum: i64,
}

/// A fixed list of numbers consumed once by cooperating workers.
pub struct SumPool {
    state: Monitor<Pool>,
}

impl SumPool {
    /// Creates a pool over `items` with a running sum of zero.
    pub fn new(items: Vec<i64>) -> Self {
        Self {
            state: Monitor::new(Pool { items, next: 0, sum: 0 }),
        }
    }

    /// Takes the next item and adds it to the sum; `None` once the list is exhausted.
    pub fn pluck_and_add(&self) -> Option<i64> {
        let mut pool = self.state.enter();
        let value = *pool.items.get(pool.next)?;
        pool.next += 1;
        pool.sum += value;
        Some(value)
    }

    /// Items not yet plucked.
    pub fn remaining(&self) -> usize {
        let pool = self.state.enter();
        pool.items.len() - pool.next
    }

    /// The sum of every item plucked so far.
    pub fn sum(&self) -> i64 {
        self.state.enter().sum
    }

    /// Drains the pool with `workers` threads; returns how many items each took.
    pub fn run_all(&self, workers: usize) -> Vec<usize> {
        let taken: Vec<usize> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| s.spawn(|| std::iter::from_fn(|| self.pluck_and_add()).count()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });
        tracing::debug!(workers, sum = self.sum(), "pool drained");
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluck_until_empty() {
        let pool = SumPool::new(vec![4, -1]);
        assert_eq!(pool.pluck_and_add(), Some(4));
        assert_eq!(pool.remaining(), 1);
        assert_eq!(pool.pluck_and_add(), Some(-1));
        assert_eq!(pool.pluck_and_add(), None);
        assert_eq!(pool.sum(), 3);
    }
}
