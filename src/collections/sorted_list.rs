//! `FineGrainedSortedList` — a descending doubly linked list with one lock per node.
//!
//! Inserts walk the list with *lock coupling* (hand-over-hand): the walker
//! holds the current node's lock, acquires the next node's lock, and only then
//! lets go of the current one. At the splice point it holds both neighbours,
//! so no two inserts can rewire overlapping links, while inserts into
//! different regions of the list run in parallel.
//!
//! ```text
//!  head(+inf) ──> 90 ──> 70 ──> 40 ──> tail(-inf)
//!     [held]   [held]
//!                 └── slide: release head, acquire 70 ...
//! ```
//!
//! The walker re-enters locks it already holds to read a node's links, which
//! is why nodes use [`ReentrantMutex`].
//!
//! Head and tail are sentinels: the tail carries `i64::MIN`, so every value
//! finds a splice point before it and the walk never passes it. Equal values
//! are all kept; their relative order is unspecified.
//!
//! Reads ([`display`](FineGrainedSortedList::display)) take each node's lock
//! to read its link, one node at a time. The result is a lazy snapshot: it is
//! sorted, but not linearizable against inserts that run concurrently.

use crate::concurrency::sync::ReentrantMutex;
use std::cell::RefCell;
use std::sync::{Arc, Weak};

struct Links {
    next: Option<Arc<Node>>,
    prev: Weak<Node>,
}

struct Node {
    value: i64,
    links: ReentrantMutex<RefCell<Links>>,
}

impl Node {
    fn new(value: i64, next: Option<Arc<Node>>, prev: Weak<Node>) -> Self {
        Self {
            value,
            links: ReentrantMutex::new(RefCell::new(Links { next, prev })),
        }
    }

    fn next(&self) -> Option<Arc<Node>> {
        self.links.lock().borrow().next.clone()
    }

    fn prev(&self) -> Option<Arc<Node>> {
        self.links.lock().borrow().prev.upgrade()
    }

    fn unlock(&self) {
        if let Err(err) = self.links.release() {
            unreachable!("hand-over-hand walk released a node lock it does not hold: {err}");
        }
    }
}

/// A sorted (non-increasing) list supporting concurrent inserts.
pub struct FineGrainedSortedList {
    head: Arc<Node>,
    tail: Arc<Node>,
}

impl Default for FineGrainedSortedList {
    fn default() -> Self {
        Self::new()
    }
}

impl FineGrainedSortedList {
    /// Creates a list holding only the two sentinels.
    pub fn new() -> Self {
        let tail = Arc::new(Node::new(i64::MIN, None, Weak::new()));
        let head = Arc::new(Node::new(i64::MAX, Some(Arc::clone(&tail)), Weak::new()));
        tail.links.lock().borrow_mut().prev = Arc::downgrade(&head);
        Self { head, tail }
    }

    /// Inserts `value` before the first node whose value is `<= value`.
    pub fn insert(&self, value: i64) {
        let mut curr = Arc::clone(&self.head);
        curr.links.acquire();
        loop {
            let Some(next) = curr.next() else {
                unreachable!("walked past the tail sentinel");
            };
            next.links.acquire();

            if next.value <= value {
                let node = Arc::new(Node::new(value, Some(Arc::clone(&next)), Arc::downgrade(&curr)));
                curr.links.lock().borrow_mut().next = Some(Arc::clone(&node));
                next.links.lock().borrow_mut().prev = Arc::downgrade(&node);
                next.unlock();
                curr.unlock();
                return;
            }

            curr.unlock();
            curr = next;
        }
    }

    /// Values from head to tail (non-increasing), sentinels excluded.
    pub fn display(&self) -> Vec<i64> {
        let mut values = Vec::new();
        let mut curr = self.head.next();
        while let Some(node) = curr {
            if Arc::ptr_eq(&node, &self.tail) {
                break;
            }
            values.push(node.value);
            curr = node.next();
        }
        values
    }

    /// Values from tail to head (non-decreasing), following the back links.
    pub fn display_reverse(&self) -> Vec<i64> {
        let mut values = Vec::new();
        let mut curr = self.tail.prev();
        while let Some(node) = curr {
            if Arc::ptr_eq(&node, &self.head) {
                break;
            }
            values.push(node.value);
            curr = node.prev();
        }
        values
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.display().len()
    }

    /// Whether only the sentinels are present.
    pub fn is_empty(&self) -> bool {
        self.head.next().is_some_and(|next| Arc::ptr_eq(&next, &self.tail))
    }
}

impl Drop for FineGrainedSortedList {
    fn drop(&mut self) {
        // Unlink front to back so a long chain does not drop recursively.
        let mut curr = self.head.links.lock().borrow_mut().next.take();
        while let Some(node) = curr {
            curr = node.links.lock().borrow_mut().next.take();
        }
    }
}
