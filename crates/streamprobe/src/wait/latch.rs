//! One-shot completion latch and the interrupt token waiters honour.

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a [`OneShotLatch::wait`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchWait {
    Fired,
    TimedOut,
    Interrupted,
}

/// A latch that transitions from unset to set exactly once.
///
/// `fire` may be called any number of times from any thread; only the first
/// call performs the transition.
pub struct OneShotLatch {
    fired: AtomicBool,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl OneShotLatch {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            fired: AtomicBool::new(false),
            tx,
            rx,
        }
    }

    /// Set the latch. Returns `true` only for the call that set it.
    pub fn fire(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // capacity 1 and a single winner: never full
            let _ = self.tx.try_send(());
            true
        } else {
            false
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Block until the latch fires, `timeout` elapses, or `interrupt` is
    /// triggered. A pending interrupt wins over an already fired latch.
    pub fn wait(&self, timeout: Duration, interrupt: Option<&Interrupt>) -> LatchWait {
        if interrupt.is_some_and(Interrupt::is_interrupted) {
            return LatchWait::Interrupted;
        }
        if self.is_fired() {
            return LatchWait::Fired;
        }

        match interrupt {
            Some(interrupt) => {
                let signal = interrupt.signal();
                // triggered between the check above and taking the receiver
                if interrupt.is_interrupted() {
                    return LatchWait::Interrupted;
                }
                crossbeam::select! {
                    recv(self.rx) -> _ => LatchWait::Fired,
                    recv(signal) -> _ => LatchWait::Interrupted,
                    default(timeout) => LatchWait::TimedOut,
                }
            }
            None => match self.rx.recv_timeout(timeout) {
                Ok(()) => LatchWait::Fired,
                Err(_) => LatchWait::TimedOut,
            },
        }
    }
}

impl Default for OneShotLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OneShotLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotLatch")
            .field("fired", &self.is_fired())
            .finish()
    }
}

struct InterruptChannel {
    /// Dropped on trigger, which disconnects `signal` for every waiter at once
    trigger_tx: Option<Sender<()>>,
    signal: Receiver<()>,
}

impl InterruptChannel {
    fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger_tx: Some(tx),
            signal: rx,
        }
    }
}

struct InterruptInner {
    /// Written only under `channel`'s lock
    triggered: AtomicBool,
    channel: Mutex<InterruptChannel>,
}

/// Cancellation token for blocking waits.
///
/// Triggering is sticky: once set, the token stays set, every current waiter
/// wakes up, and every later wait that honours it returns immediately, until
/// [`clear`](Interrupt::clear) resets it.
#[derive(Clone)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InterruptInner {
                triggered: AtomicBool::new(false),
                channel: Mutex::new(InterruptChannel::new()),
            }),
        }
    }

    /// Interrupt current and future waits. Idempotent.
    pub fn trigger(&self) {
        let mut channel = self.inner.channel.lock();
        if !self.inner.triggered.swap(true, Ordering::AcqRel) {
            channel.trigger_tx.take();
        }
    }

    /// Reset a triggered token so later waits block again. Returns whether
    /// the token was set.
    pub fn clear(&self) -> bool {
        let mut channel = self.inner.channel.lock();
        let was_set = self.inner.triggered.swap(false, Ordering::AcqRel);
        if was_set {
            *channel = InterruptChannel::new();
        }
        was_set
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Receiver that disconnects when the token is triggered.
    pub(crate) fn signal(&self) -> Receiver<()> {
        self.inner.channel.lock().signal.clone()
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}
