//! # Response Correlator
//!
//! Process-wide registry matching inbound responses to the single call
//! waiting on their id.
//!
//! The registry lock covers lookup, insertion and removal only. Publishing
//! clones nothing and awaits nothing while the lock is held: the enqueue is a
//! `try_send`, so a subscriber that stopped draining loses messages instead of
//! stalling every other call in the process.

use std::collections::HashMap;

use parking_lot::Mutex;
use tether_core::{Error, Message, Result};
use tokio::sync::mpsc::{self, error::TrySendError, WeakSender};
use tracing::{debug, warn};

use crate::config::DEFAULT_SUBSCRIPTION_CAPACITY;
use crate::link::InboundResponses;

/// What happened to a published message.
///
/// Every variant is a successful publish; delivery is best effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Enqueued for the subscriber.
    Delivered,
    /// Nobody is waiting on this id.
    NoSubscriber,
    /// The subscriber's queue was full or its consumer is gone.
    Dropped,
}

pub struct Correlator {
    subscribers: Mutex<HashMap<String, mpsc::Sender<Message>>>,
    capacity: usize,
}

impl Correlator {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register the only subscription allowed for `id`.
    pub fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<Message>> {
        self.subscribe_owned(id).map(|(receiver, _)| receiver)
    }

    /// Like [`subscribe`](Self::subscribe), also returning a handle that
    /// identifies this registration to [`release`](Self::release).
    pub(crate) fn subscribe_owned(
        &self,
        id: &str,
    ) -> Result<(mpsc::Receiver<Message>, WeakSender<Message>)> {
        let mut subscribers = self.subscribers.lock();

        if subscribers.contains_key(id) {
            return Err(Error::AlreadySubscribed(id.to_string()));
        }

        let (sender, receiver) = mpsc::channel(self.capacity);
        let owner = sender.downgrade();
        subscribers.insert(id.to_string(), sender);
        debug!(id, "Subscribed");

        Ok((receiver, owner))
    }

    /// Remove `id` only if it is still the registration `owner` refers to.
    pub(crate) fn release(&self, id: &str, owner: &WeakSender<Message>) -> bool {
        let Some(owner) = owner.upgrade() else {
            return false;
        };

        let mut subscribers = self.subscribers.lock();
        let owned = subscribers
            .get(id)
            .is_some_and(|sender| sender.same_channel(&owner));
        if owned {
            subscribers.remove(id);
            debug!(id, "Unsubscribed");
        }
        owned
    }

    pub fn unsubscribe(&self, id: &str) -> Result<()> {
        match self.subscribers.lock().remove(id) {
            Some(_) => {
                debug!(id, "Unsubscribed");
                Ok(())
            }
            None => Err(Error::NotSubscribed(id.to_string())),
        }
    }

    pub fn publish(&self, message: Message) -> Delivery {
        let subscribers = self.subscribers.lock();

        let Some(sender) = subscribers.get(&message.id) else {
            debug!(id = %message.id, kind = %message.kind, "Response dropped (no subscriber)");
            return Delivery::NoSubscriber;
        };

        match sender.try_send(message) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(message)) => {
                warn!(id = %message.id, kind = %message.kind, "Response dropped (subscriber queue full)");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(message)) => {
                debug!(id = %message.id, kind = %message.kind, "Response dropped (subscriber closing)");
                Delivery::Dropped
            }
        }
    }

    pub fn is_subscribed(&self, id: &str) -> bool {
        self.subscribers.lock().contains_key(id)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIPTION_CAPACITY)
    }
}

impl InboundResponses for Correlator {
    fn accept_response(&self, message: Message) -> Result<()> {
        message.validate()?;
        self.publish(message);
        Ok(())
    }
}
