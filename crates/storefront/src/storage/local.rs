//! The shared storage medium and per-context handles.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use super::event::{ContextId, StorageEvent, Subscription};
use super::{MemoryArea, StorageArea, StorageError};

/// Pending notifications buffered per subscriber before it lags.
const EVENT_CAPACITY: usize = 64;

/// Storage shared by every browsing context of one origin.
///
/// This struct is cheaply cloneable via `Arc`; every clone refers to the same
/// area and the same notification channel.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<LocalStorageInner>,
}

struct LocalStorageInner {
    area: Arc<dyn StorageArea>,
    events: broadcast::Sender<StorageEvent>,
}

impl LocalStorage {
    /// Create a storage medium over `area`.
    #[must_use]
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(LocalStorageInner { area, events }),
        }
    }

    /// Create an unbounded in-memory storage medium.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryArea::new()))
    }

    /// Open a new browsing context on this medium.
    #[must_use]
    pub fn context(&self) -> StorageContext {
        StorageContext {
            id: ContextId::new(),
            storage: self.clone(),
        }
    }

    /// The backing area.
    #[must_use]
    pub fn area(&self) -> &Arc<dyn StorageArea> {
        &self.inner.area
    }

    fn publish(&self, event: StorageEvent) {
        // No receivers simply means no other context is listening.
        if self.inner.events.send(event).is_err() {
            trace!("Storage change had no subscribers");
        }
    }
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("subscribers", &self.inner.events.receiver_count())
            .finish_non_exhaustive()
    }
}

/// One browsing context's view of a [`LocalStorage`].
///
/// Every change made through a context is announced to subscribers of all
/// other contexts. Writing a value identical to the stored one announces
/// nothing.
#[derive(Debug, Clone)]
pub struct StorageContext {
    id: ContextId,
    storage: LocalStorage,
}

impl StorageContext {
    /// This context's identifier.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// The medium this context belongs to.
    #[must_use]
    pub const fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.area().get_item(key)
    }

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit or cannot be written.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.storage.area().set_item(key, value)?;
        if old_value.as_deref() != Some(value) {
            self.storage.publish(StorageEvent {
                key: Some(key.to_string()),
                old_value,
                new_value: Some(value.to_string()),
                source: self.id,
            });
        }
        Ok(())
    }

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if let Some(old_value) = self.storage.area().remove_item(key)? {
            self.storage.publish(StorageEvent {
                key: Some(key.to_string()),
                old_value: Some(old_value),
                new_value: None,
                source: self.id,
            });
        }
        Ok(())
    }

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        let area = self.storage.area();
        if area.is_empty()? {
            return Ok(());
        }
        area.clear()?;
        self.storage.publish(StorageEvent {
            key: None,
            old_value: None,
            new_value: None,
            source: self.id,
        });
        Ok(())
    }

    /// Subscribe to changes made by other contexts.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.id, self.storage.inner.events.subscribe())
    }
}
