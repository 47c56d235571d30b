//! In-memory storage area.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{StorageArea, StorageError, check_quota, entry_size};

/// A storage area held entirely in memory.
///
/// Used for tests and for hosts that do not need state to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryArea {
    entries: RwLock<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryArea {
    /// Create an unbounded area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an area that rejects writes once `quota` bytes are in use.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::default(),
            quota: Some(quota),
        }
    }
}

impl StorageArea for MemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;

        let used = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        check_quota(
            self.quota,
            used,
            key,
            entries.get(key).map(String::as_str),
            value,
        )?;

        Ok(entries.insert(key.to_string(), value.to_string()))
    }

    fn remove_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.remove(key))
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_area_basic_contract() {
        let area = MemoryArea::new();

        // starts empty
        assert!(area.is_empty().unwrap());
        assert!(area.get_item("missing").unwrap().is_none());

        // set + get
        assert_eq!(area.set_item("a", "1").unwrap(), None);
        area.set_item("b", "2").unwrap();
        assert_eq!(area.len().unwrap(), 2);
        assert_eq!(area.get_item("a").unwrap().as_deref(), Some("1"));

        // overwrite returns the old value
        assert_eq!(area.set_item("a", "ONE").unwrap().as_deref(), Some("1"));
        assert_eq!(area.keys().unwrap(), vec!["a", "b"]);

        // remove
        assert_eq!(area.remove_item("b").unwrap().as_deref(), Some("2"));
        assert_eq!(area.remove_item("b").unwrap(), None);

        // clear
        area.clear().unwrap();
        assert!(area.is_empty().unwrap());
    }

    #[test]
    fn test_memory_area_quota() {
        let area = MemoryArea::with_quota(10);
        area.set_item("key", "1234567").unwrap();

        let err = area.set_item("other", "x").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));

        // The rejected write left the area untouched.
        assert_eq!(area.keys().unwrap(), vec!["key"]);
        assert_eq!(area.get_item("key").unwrap().as_deref(), Some("1234567"));
    }
}
