//! Bounded waits for messages on a topic.
//!
//! A wait goes through `SUBSCRIBING -> WAITING -> {MATCHED | TIMED_OUT |
//! INTERRUPTED} -> TORN_DOWN`. The subscription is released on every path,
//! including broker errors and panics inside the per-message callback.
//!
//! When several matching messages race, the first one to fire the latch wins.
//! Which one that is depends on delivery timing and is not deterministic.

mod latch;
mod waiter;

pub use latch::{Interrupt, LatchWait, OneShotLatch};
pub use waiter::{MessageWaiter, WaitOutcome, DEFAULT_TIMEOUT};
