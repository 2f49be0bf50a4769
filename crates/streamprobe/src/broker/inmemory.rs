use super::{
    validate_topic, Broker, BrokerError, MessageCallback, OffsetReset, Publisher,
    SubscriptionHandle,
};
use bytes::Bytes;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Retained messages and live subscriber channels for one topic.
#[derive(Default)]
struct TopicLog {
    retained: Vec<Bytes>,
    subscribers: HashMap<u64, Sender<Bytes>>,
}

struct Subscription {
    topic: String,
    /// Buffered messages, handed to the delivery thread by `on_message`
    pending: Option<Receiver<Bytes>>,
    /// Dropping the sender tells the delivery thread to stop
    shutdown_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

/// In-process broker with per-topic retention.
///
/// Every subscription gets its own unbounded channel and, once a callback is
/// attached, its own delivery thread. Publishing appends to the topic log and
/// fans the payload out to every live subscription of that topic.
pub struct InMemoryBroker {
    topics: RwLock<HashMap<String, TopicLog>>,
    subscriptions: Mutex<HashMap<u64, Subscription>>,
    next_id: AtomicU64,
    offset_reset: OffsetReset,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_offset_reset(OffsetReset::default())
    }

    pub fn with_offset_reset(offset_reset: OffsetReset) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            offset_reset,
        }
    }

    pub fn offset_reset(&self) -> OffsetReset {
        self.offset_reset
    }

    /// Number of subscriptions that have not been released yet.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Number of messages retained for `topic`.
    pub fn retained(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map_or(0, |log| log.retained.len())
    }

    /// Drop every retained message. Live subscriptions are left untouched.
    pub fn clear(&self) {
        let mut topics = self.topics.write();
        let dropped: usize = topics
            .values_mut()
            .map(|log| std::mem::take(&mut log.retained).len())
            .sum();
        debug!("Cleared {} retained messages", dropped);
    }

    /// Release every live subscription.
    pub fn shutdown(&self) {
        let handles: Vec<SubscriptionHandle> = self
            .subscriptions
            .lock()
            .iter()
            .map(|(id, sub)| SubscriptionHandle::new(*id, sub.topic.clone()))
            .collect();

        if !handles.is_empty() {
            info!("Releasing {} live subscriptions", handles.len());
        }
        for handle in &handles {
            self.unsubscribe(handle);
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBroker")
            .field("offset_reset", &self.offset_reset)
            .field("topics", &self.topics.read().len())
            .field("active_subscriptions", &self.active_subscriptions())
            .finish()
    }
}

impl Drop for InMemoryBroker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Broker for InMemoryBroker {
    fn subscribe(&self, topic: &str) -> Result<SubscriptionHandle, BrokerError> {
        validate_topic(topic)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();

        {
            // Replay and registration happen under one write lock so a concurrent
            // publish is seen exactly once.
            let mut topics = self.topics.write();
            let log = topics.entry(topic.to_string()).or_default();
            if self.offset_reset == OffsetReset::Earliest {
                for payload in &log.retained {
                    let _ = tx.send(payload.clone());
                }
            }
            log.subscribers.insert(id, tx);
        }

        self.subscriptions.lock().insert(
            id,
            Subscription {
                topic: topic.to_string(),
                pending: Some(rx),
                shutdown_tx: None,
                worker: None,
            },
        );

        let handle = SubscriptionHandle::new(id, topic);
        debug!("Opened subscription {} ({:?})", handle, self.offset_reset);
        Ok(handle)
    }

    fn on_message(
        &self,
        handle: &SubscriptionHandle,
        callback: MessageCallback,
    ) -> Result<(), BrokerError> {
        let id = handle.id();
        let mut subscriptions = self.subscriptions.lock();
        let subscription = subscriptions
            .get_mut(&id)
            .ok_or(BrokerError::UnknownSubscription(id))?;
        let messages = subscription
            .pending
            .take()
            .ok_or(BrokerError::CallbackAlreadyRegistered(id))?;

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let worker = thread::Builder::new()
            .name(format!("delivery-{}-{}", subscription.topic, id))
            .spawn(move || deliver(id, messages, shutdown_rx, callback))
            .map_err(|source| BrokerError::Delivery { id, source })?;

        subscription.shutdown_tx = Some(shutdown_tx);
        subscription.worker = Some(worker);
        Ok(())
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let Some(subscription) = self.subscriptions.lock().remove(&handle.id()) else {
            debug!("Subscription {} already released", handle);
            return;
        };

        let Subscription {
            topic,
            shutdown_tx,
            worker,
            ..
        } = subscription;

        if let Some(log) = self.topics.write().get_mut(&topic) {
            log.subscribers.remove(&handle.id());
        }

        drop(shutdown_tx);

        if let Some(worker) = worker {
            // A callback releasing its own subscription must not join itself
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!("Delivery thread for {} panicked", handle);
            }
        }

        debug!("Released subscription {}", handle);
    }
}

impl Publisher for InMemoryBroker {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
        validate_topic(topic)?;

        let mut topics = self.topics.write();
        let log = topics.entry(topic.to_string()).or_default();
        log.retained.push(payload.clone());
        for tx in log.subscribers.values() {
            let _ = tx.send(payload.clone());
        }

        debug!(
            topic,
            subscribers = log.subscribers.len(),
            bytes = payload.len(),
            "Published message"
        );
        Ok(())
    }
}

/// Delivery loop for one subscription.
fn deliver(id: u64, messages: Receiver<Bytes>, shutdown: Receiver<()>, callback: MessageCallback) {
    debug!("Delivery thread for subscription {} started", id);

    loop {
        // Shutdown wins over buffered messages
        if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }

        crossbeam::select! {
            recv(shutdown) -> _ => break,
            recv(messages) -> message => match message {
                Ok(payload) => {
                    if panic::catch_unwind(AssertUnwindSafe(|| callback(&payload))).is_err() {
                        warn!("Message callback for subscription {} panicked", id);
                    }
                }
                Err(_) => break,
            },
        }
    }

    debug!("Delivery thread for subscription {} stopped", id);
}
