//! Streamprobe: a behavior-driven harness for message-streaming applications.
//!
//! Scenarios publish JSON fixtures onto topics, block until a message matching a
//! set of path expectations shows up (or a deadline passes), and report their
//! outcomes to a test-management service.

// ===== Core: structural matching and bounded waits =====
pub mod matcher;
pub mod wait;

// ===== Collaborators and harness glue =====
pub mod broker;
pub mod config;
pub mod fixture;
pub mod logging;
pub mod reporting;

pub use broker::{Broker, BrokerError, InMemoryBroker, OffsetReset, Publisher, SubscriptionHandle};
pub use matcher::{matches, ExpectationSet};
pub use wait::{Interrupt, MessageWaiter, WaitOutcome};
