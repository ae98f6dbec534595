//! Concurrent collections with per-node locking.

pub mod sorted_list;

pub use sorted_list::FineGrainedSortedList;
