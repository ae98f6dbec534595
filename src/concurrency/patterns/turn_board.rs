//! `TurnBoard` — a ticket counter that participants wait on.
//!
//! The board shows the ticket being served. A participant holding ticket `t`
//! blocks until the board shows `t`, re-checking after every wake-up because a
//! broadcast wakes everybody and most of them are not next. Whoever moves the
//! board forward, either a manager calling [`advance`](TurnBoard::advance) or
//! the served participant calling [`pass_turn`](TurnBoard::pass_turn), wakes
//! all waiters.

use crate::concurrency::sync::Monitor;
use crate::error::{Interrupted, TurnError};
use std::thread::ThreadId;
use std::time::Duration;

/// A shared "now serving" counter.
pub struct TurnBoard {
    serving: Monitor<u64>,
}

impl Default for TurnBoard {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TurnBoard {
    /// Creates a board serving `first`.
    pub fn new(first: u64) -> Self {
        Self {
            serving: Monitor::new(first),
        }
    }

    /// The ticket being served.
    pub fn current(&self) -> u64 {
        *self.serving.enter()
    }

    /// Blocks until the board shows `ticket`.
    pub fn wait_for_turn(&self, ticket: u64) {
        self.serving.enter().wait_while(|serving| *serving != ticket);
    }

    /// Interruptible form of [`wait_for_turn`](Self::wait_for_turn).
    pub fn wait_for_turn_interruptibly(&self, ticket: u64) -> Result<(), Interrupted> {
        self.serving
            .enter()
            .wait_while_interruptibly(|serving| *serving != ticket)
    }

    /// Waits up to `timeout`; returns whether `ticket` came up.
    pub fn wait_for_turn_timeout(&self, ticket: u64, timeout: Duration) -> bool {
        self.serving
            .enter()
            .wait_while_for(|serving| *serving != ticket, timeout)
    }

    /// Moves the board forward one ticket and wakes everyone; returns the new ticket.
    pub fn advance(&self) -> u64 {
        let mut serving = self.serving.enter();
        *serving += 1;
        serving.notify_all();
        *serving
    }

    /// Advances the board on behalf of the participant holding `ticket`.
    ///
    /// Fails without changing the board if `ticket` is not being served.
    pub fn pass_turn(&self, ticket: u64) -> Result<u64, TurnError> {
        let mut serving = self.serving.enter();
        if *serving != ticket {
            return Err(TurnError::NotYourTurn {
                ticket,
                current: *serving,
            });
        }
        *serving += 1;
        serving.notify_all();
        Ok(*serving)
    }

    /// Waits for `ticket` and immediately passes the turn on.
    pub fn take_turn(&self, ticket: u64) -> u64 {
        let mut serving = self.serving.enter();
        serving.wait_while(|serving| *serving != ticket);
        *serving += 1;
        serving.notify_all();
        *serving
    }

    /// Posts an interrupt for `thread`; see [`Monitor::interrupt`].
    pub fn interrupt(&self, thread: ThreadId) {
        self.serving.interrupt(thread);
    }
}
