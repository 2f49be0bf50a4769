use super::latch::{Interrupt, LatchWait, OneShotLatch};
use crate::broker::{Broker, BrokerError, MessageCallback, SubscriptionHandle};
use crate::matcher::{self, ExpectationSet};
use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default wait when the caller does not pass one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Terminal state of one wait, before the subscription is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Matched,
    TimedOut,
    Interrupted,
}

impl WaitOutcome {
    /// Only a match counts as success.
    pub fn matched(self) -> bool {
        self == WaitOutcome::Matched
    }
}

impl From<LatchWait> for WaitOutcome {
    fn from(wait: LatchWait) -> Self {
        match wait {
            LatchWait::Fired => WaitOutcome::Matched,
            LatchWait::TimedOut => WaitOutcome::TimedOut,
            LatchWait::Interrupted => WaitOutcome::Interrupted,
        }
    }
}

/// Releases a subscription when dropped, whichever way the wait ends.
struct SubscriptionGuard<'a> {
    broker: &'a dyn Broker,
    handle: SubscriptionHandle,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.broker.unsubscribe(&self.handle);
        debug!("Tore down subscription {}", self.handle);
    }
}

/// Blocks the calling thread until a message satisfying a predicate arrives
/// on a topic, or a deadline passes.
///
/// Every wait opens a fresh subscription and owns it exclusively. Clones share
/// the broker and the interrupt token.
#[derive(Clone)]
pub struct MessageWaiter {
    broker: Arc<dyn Broker>,
    interrupt: Interrupt,
    default_timeout: Duration,
}

impl MessageWaiter {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            interrupt: Interrupt::new(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Share `interrupt` with this waiter. After a trigger every wait returns
    /// `false` at once until [`Interrupt::clear`] is called.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Token that interrupts this waiter's blocking calls.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Wait for a message on `topic` that satisfies `expectations`.
    ///
    /// Returns `false` on timeout, on interruption, and when the subscription
    /// cannot be opened. Not finding a message is an expected outcome, never
    /// an error.
    pub fn wait_for_match(
        &self,
        topic: &str,
        expectations: &ExpectationSet,
        timeout: Duration,
    ) -> bool {
        match self.try_wait_for_match(topic, expectations, timeout) {
            Ok(outcome) => outcome.matched(),
            Err(e) => {
                error!("Could not wait on topic {}: {}", topic, e);
                false
            }
        }
    }

    /// [`wait_for_match`](Self::wait_for_match) bounded by the default timeout.
    pub fn wait_for_match_default(&self, topic: &str, expectations: &ExpectationSet) -> bool {
        self.wait_for_match(topic, expectations, self.default_timeout)
    }

    /// Like [`wait_for_match`](Self::wait_for_match), but reports the terminal
    /// state and surfaces broker failures.
    pub fn try_wait_for_match(
        &self,
        topic: &str,
        expectations: &ExpectationSet,
        timeout: Duration,
    ) -> Result<WaitOutcome, BrokerError> {
        debug!(
            "Searching in topic {} with expected values {}",
            topic, expectations
        );
        let expectations = expectations.clone();
        self.try_wait_for(
            topic,
            move |message| matcher::matches(message, &expectations),
            timeout,
        )
    }

    /// Wait for a message on `topic` for which `predicate` returns `true`.
    pub fn wait_for<P>(&self, topic: &str, predicate: P, timeout: Duration) -> bool
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        match self.try_wait_for(topic, predicate, timeout) {
            Ok(outcome) => outcome.matched(),
            Err(e) => {
                error!("Could not wait on topic {}: {}", topic, e);
                false
            }
        }
    }

    /// Core wait: subscribe, attach the matching callback, block on the latch,
    /// and release the subscription on every exit path.
    pub fn try_wait_for<P>(
        &self,
        topic: &str,
        predicate: P,
        timeout: Duration,
    ) -> Result<WaitOutcome, BrokerError>
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let started = Instant::now();
        let latch = Arc::new(OneShotLatch::new());

        let handle = self.broker.subscribe(topic)?;
        let guard = SubscriptionGuard {
            broker: self.broker.as_ref(),
            handle,
        };

        let callback = match_callback(topic, Arc::clone(&latch), predicate);
        self.broker.on_message(&guard.handle, callback)?;

        let outcome = WaitOutcome::from(latch.wait(timeout, Some(&self.interrupt)));
        match outcome {
            WaitOutcome::Matched => info!(
                "Found matching message in topic {} after {:?}",
                topic,
                started.elapsed()
            ),
            WaitOutcome::TimedOut => warn!(
                "Timeout while waiting for matching message in topic {} ({:?})",
                topic, timeout
            ),
            WaitOutcome::Interrupted => {
                warn!("Interrupted while waiting for matching message in topic {}", topic)
            }
        }

        drop(guard);
        Ok(outcome)
    }

    /// Run [`wait_for_match`](Self::wait_for_match) on tokio's blocking pool.
    pub async fn wait_for_match_async(
        &self,
        topic: impl Into<String>,
        expectations: ExpectationSet,
        timeout: Duration,
    ) -> bool {
        let waiter = self.clone();
        let topic = topic.into();
        match tokio::task::spawn_blocking(move || {
            waiter.wait_for_match(&topic, &expectations, timeout)
        })
        .await
        {
            Ok(found) => found,
            Err(e) => {
                error!("Blocking wait task failed: {}", e);
                false
            }
        }
    }
}

impl fmt::Debug for MessageWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageWaiter")
            .field("interrupt", &self.interrupt)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

/// Build the per-message callback. Runs on the broker's delivery thread.
///
/// Panics raised by the predicate are caught here and logged; they neither
/// count as a match nor reach the broker.
fn match_callback<P>(topic: &str, latch: Arc<OneShotLatch>, predicate: P) -> MessageCallback
where
    P: Fn(&str) -> bool + Send + Sync + 'static,
{
    let topic = topic.to_string();
    Box::new(move |payload: &Bytes| {
        if latch.is_fired() {
            return;
        }

        let message = String::from_utf8_lossy(payload);
        debug!("Received message from topic {}: {}", topic, message);

        match panic::catch_unwind(AssertUnwindSafe(|| predicate(&*message))) {
            Ok(true) => {
                if latch.fire() {
                    debug!("Signalled match on topic {}", topic);
                }
            }
            Ok(false) => {}
            Err(cause) => error!(
                "Error processing message from topic {}: {}",
                topic,
                panic_message(cause.as_ref())
            ),
        }
    })
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
