//! Change notifications between browsing contexts.

use core::fmt;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

/// Identifies one browsing context (tab) on a storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change written to the storage medium by some context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key, or `None` when the whole area was cleared.
    pub key: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change, or `None` when the key was removed.
    pub new_value: Option<String>,
    /// Context that made the change.
    pub source: ContextId,
}

/// What a [`Subscription`] delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A change made by another context.
    Event(StorageEvent),
    /// The subscriber fell behind and this many events were dropped.
    Lagged(u64),
}

/// Stream of changes made by contexts other than the subscriber's own.
#[derive(Debug)]
pub struct Subscription {
    context: ContextId,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl Subscription {
    pub(crate) const fn new(
        context: ContextId,
        receiver: broadcast::Receiver<StorageEvent>,
    ) -> Self {
        Self { context, receiver }
    }

    /// Next queued change, without waiting.
    ///
    /// Returns `None` when nothing is queued.
    pub fn try_next(&mut self) -> Option<Received> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.source == self.context => {}
                Ok(event) => return Some(Received::Event(event)),
                Err(TryRecvError::Lagged(skipped)) => return Some(Received::Lagged(skipped)),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the storage medium has been dropped.
    pub async fn next(&mut self) -> Option<Received> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.source == self.context => {}
                Ok(event) => return Some(Received::Event(event)),
                Err(RecvError::Lagged(skipped)) => return Some(Received::Lagged(skipped)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
