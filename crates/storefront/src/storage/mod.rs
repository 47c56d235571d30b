//! Origin-scoped durable key/value storage.
//!
//! # Concepts
//!
//! - [`StorageArea`] - Object-safe key/value backend (`get_item`, `set_item`,
//!   `remove_item`, `clear`). Implemented by [`MemoryArea`] and [`FileArea`].
//! - [`LocalStorage`] - The storage medium shared by every browsing context
//!   of one origin: a single area plus a change-notification channel.
//! - [`StorageContext`] - One browsing context's handle on the medium. Writes
//!   made through a context are announced to every *other* context.
//! - [`Subscription`] - Receives [`StorageEvent`]s written by other contexts.
//!
//! There is no locking beyond single operations and no transactions:
//! concurrent writers race and the last write wins.
//!
//! # Example
//!
//! ```rust
//! use shopflow_storefront::storage::{LocalStorage, Received};
//!
//! let storage = LocalStorage::in_memory();
//! let first_tab = storage.context();
//! let second_tab = storage.context();
//! let mut updates = second_tab.subscribe();
//!
//! first_tab.set_item("greeting", "hello").unwrap();
//!
//! let Some(Received::Event(event)) = updates.try_next() else {
//!     panic!("expected an event");
//! };
//! assert_eq!(event.new_value.as_deref(), Some("hello"));
//! ```

mod event;
mod file;
mod local;
mod memory;

pub use event::{ContextId, Received, StorageEvent, Subscription};
pub use file::FileArea;
pub use local::{LocalStorage, StorageContext};
pub use memory::MemoryArea;

use thiserror::Error;

/// Default per-origin quota, matching what browsers grant `localStorage`.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the value would exceed the area's quota.
    #[error("quota exceeded writing {key}: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A writer panicked while holding the area's lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Object-safe key/value storage area (the DOM's `Storage`).
///
/// `set_item` and `remove_item` return the value they replaced so callers can
/// describe the change without a second read.
pub trait StorageArea: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] if the value does not fit, or
    /// another error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<Option<String>, StorageError>;

    /// Remove `key`, returning the value it held.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear(&self) -> Result<(), StorageError>;

    /// Stored keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.keys()?.len())
    }

    /// Whether the area holds no keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Bytes an entry counts against a quota.
pub(crate) const fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Check that replacing `old` with `new` under `key` keeps usage within `quota`.
pub(crate) fn check_quota(
    quota: Option<usize>,
    used: usize,
    key: &str,
    old: Option<&str>,
    new: &str,
) -> Result<(), StorageError> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let freed = old.map_or(0, |old| entry_size(key, old));
    let needed = entry_size(key, new);
    let available = quota.saturating_sub(used.saturating_sub(freed));

    if needed > available {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            needed,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_allows_replacing_within_limit() {
        // "k" + "abcd" = 5 bytes in use, replacing it with "wxyz" stays at 5.
        assert!(check_quota(Some(5), 5, "k", Some("abcd"), "wxyz").is_ok());
    }

    #[test]
    fn test_quota_rejects_growth_past_limit() {
        let err = check_quota(Some(5), 5, "k", Some("abcd"), "abcde").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 6,
                available: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_no_quota_means_unbounded() {
        assert!(check_quota(None, usize::MAX, "k", None, "value").is_ok());
    }
}
