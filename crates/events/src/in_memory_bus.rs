//! Process-local fan-out of published messages.
//!
//! Every subscription gets its own unbounded queue. A message reaches the
//! subscriptions registered when it is published; nothing is replayed to
//! later subscribers, and a queue nobody reads from grows until its
//! [`Subscription`] is dropped.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    queues: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions, counting ones dropped since the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.queues.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl<M: Clone> InMemoryEventBus<M> {
    /// Queue `message` on every live subscription and return how many took it.
    ///
    /// Subscriptions whose receiving side is gone are unregistered here.
    /// Publishing with no subscribers is not an error.
    pub fn broadcast(&self, message: M) -> Result<usize, InMemoryBusError> {
        let mut queues = self.queues.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        queues.retain(|queue| queue.send(message.clone()).is_ok());
        Ok(queues.len())
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            queues: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.broadcast(message).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (queue, receiver) = mpsc::channel();
        // After poisoning the subscription stays empty.
        if let Ok(mut queues) = self.queues.lock() {
            queues.push(queue);
        }
        Subscription::new(receiver)
    }
}
