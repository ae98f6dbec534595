//! Small coordination patterns built directly on [`Monitor`](super::sync::Monitor).
//!
//! Each pattern is one shared state plus one condition: a ticket board that
//! serves participants in order, a sequencer that lets roles take turns
//! counting, a pool that workers drain into one running sum, and a doorbell
//! whose ring is never lost.

pub mod doorbell;
pub mod sequencer;
pub mod sum_pool;
pub mod turn_board;

pub use doorbell::Doorbell;
pub use sequencer::{even_odd, fizz_buzz, Role, Sequencer};
pub use sum_pool::SumPool;
pub use turn_board::TurnBoard;
