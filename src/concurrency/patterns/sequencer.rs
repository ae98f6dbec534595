//! `Sequencer` — several roles take turns counting up to a limit.
//!
//! The classic interview puzzles (even/odd printers, FizzBuzz with four
//! threads) are one pattern: a shared counter, and each role waits until the
//! counter is a number it owns. Nothing happens until the condition holds, so
//! each role sleeps on the monitor instead of polling the counter.
//!
//! The transcript of who claimed which number is written inside the monitor;
//! no caller-supplied code runs while the lock is held.

use crate::concurrency::sync::Monitor;
use std::thread;

/// A named predicate over the numbers a participant may claim.
#[derive(Debug, Clone, Copy)]
pub struct Role {
    /// Label written to the transcript.
    pub name: &'static str,
    /// Whether this role owns a number.
    pub claims: fn(u64) -> bool,
}

impl Role {
    /// Creates a role.
    pub const fn new(name: &'static str, claims: fn(u64) -> bool) -> Self {
        Self { name, claims }
    }
}

/// `even` and `odd`.
pub fn even_odd() -> [Role; 2] {
    [Role::new("even", |n| n % 2 == 0), Role::new("odd", |n| n % 2 == 1)]
}

/// `fizzbuzz` (multiples of 15), `fizz` (3), `buzz` (5) and `number` (the rest).
pub fn fizz_buzz() -> [Role; 4] {
    [
        Role::new("fizzbuzz", |n| n % 15 == 0),
        Role::new("fizz", |n| n % 3 == 0 && n % 5 != 0),
        Role::new("buzz", |n| n % 5 == 0 && n % 3 != 0),
        Role::new("number", |n| n % 3 != 0 && n % 5 != 0),
    ]
}

struct Sequence {
    next: u64,
    limit: u64,
    transcript: Vec<(u64, &'static str)>,
}

/// A counter from 1 to `limit` shared by cooperating roles.
pub struct Sequencer {
    state: Monitor<Sequence>,
}

impl Sequencer {
    /// Creates a sequencer that counts `1..=limit`.
    pub fn new(limit: u64) -> Self {
        Self {
            state: Monitor::new(Sequence {
                next: 1,
                limit,
                transcript: Vec::new(),
            }),
        }
    }

    /// Claims every number `role` owns until the limit is passed; returns how many.
    ///
    /// Blocks forever if some number below the limit is owned by no running role.
    pub fn run(&self, role: Role) -> u64 {
        let mut claimed = 0;
        let mut seq = self.state.enter();
        loop {
            seq.wait_while(|s| s.next <= s.limit && !(role.claims)(s.next));
            if seq.next > seq.limit {
                return claimed;
            }
            let n = seq.next;
            seq.transcript.push((n, role.name));
            seq.next += 1;
            claimed += 1;
            seq.notify_all();
        }
    }

    /// Runs `instances` threads per role and waits for all of them.
    ///
    /// # Panics
    ///
    /// If some number in range is owned by none or several of `roles`.
    pub fn run_all(&self, roles: &[Role], instances: usize) {
        let limit = self.state.enter().limit;
        if let Some(n) = (1..=limit).find(|&n| roles.iter().filter(|r| (r.claims)(n)).count() != 1) {
            panic!("number {n} must be owned by exactly one role");
        }

        thread::scope(|s| {
            for role in roles {
                for _ in 0..instances {
                    s.spawn(move || self.run(*role));
                }
            }
        });
        tracing::debug!(limit, roles = roles.len(), instances, "sequence complete");
    }

    /// Claims so far, in claim order.
    pub fn transcript(&self) -> Vec<(u64, &'static str)> {
        self.state.enter().transcript.clone()
    }
}
