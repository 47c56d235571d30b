//! Persistent cart and wishlist store.
//!
//! The [`Store`] owns two [`ItemList`]s in memory and mirrors each to its own
//! key in a [`LocalStorage`](crate::storage::LocalStorage) through one
//! [`StorageContext`]. Other contexts on the same medium see those writes,
//! and the store applies theirs when the host drains its notifications.
//!
//! Storage is best-effort. Reads that fail or do not parse fall back to an
//! empty collection, failed writes leave the in-memory state authoritative,
//! and malformed external updates are ignored. None of these surface as
//! errors; they are logged and handed to the diagnostic hook instead.
//!
//! # Example
//!
//! ```rust,ignore
//! let storage = LocalStorage::in_memory();
//! let mut store = Store::open(storage.context());
//!
//! store.add_to_cart(item.clone());
//! store.add_to_cart(item); // no-op, already present
//! assert_eq!(store.cart().len(), 1);
//!
//! // Apply whatever other tabs wrote since the last turn.
//! store.sync_pending();
//! ```

mod collection;

use std::collections::HashSet;

pub use collection::{CART_KEY, CollectionKind, ItemList, WISHLIST_KEY};

use shopflow_core::{Item, ItemId, Price};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::add_breadcrumb;
use crate::storage::{Received, StorageContext, StorageError, StorageEvent, Subscription};

/// Why a storage round-trip was absorbed.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The storage medium refused the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored value is not a collection of items.
    #[error("malformed collection: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    /// Loading a collection from storage.
    Read,
    /// Writing a collection after a mutation.
    Write,
    /// Applying a value written by another context.
    ExternalUpdate,
}

/// An absorbed storage failure, as reported to the diagnostic hook.
#[derive(Debug)]
pub struct StorageFailure {
    pub kind: CollectionKind,
    pub operation: StorageOperation,
    pub error: PersistError,
}

/// A collection replaced by a value another context wrote.
#[derive(Debug, Clone, Copy)]
pub struct ExternalChange<'a> {
    pub kind: CollectionKind,
    /// The new, already validated collection.
    pub items: &'a ItemList,
}

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Cart totals shown next to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    /// Number of distinct items.
    pub count: usize,
    /// Sum of unit prices.
    pub total: Price,
}

type Listener = Box<dyn FnMut(&ExternalChange<'_>) + Send>;
type DiagnosticHook = Box<dyn Fn(&StorageFailure) + Send + Sync>;

/// Cart and wishlist state for one browsing context.
///
/// Created once when the application starts and kept for the whole session.
/// All operations run synchronously to completion; none of them fail.
pub struct Store {
    context: StorageContext,
    updates: Subscription,
    cart: ItemList,
    wishlist: ItemList,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    diagnostics: Option<DiagnosticHook>,
    /// Collections whose last write failed; memory is ahead of storage.
    unsaved: HashSet<CollectionKind>,
}

impl Store {
    /// Open the store on a browsing context, loading both collections.
    #[must_use]
    pub fn open(context: StorageContext) -> Self {
        Self::build(context, None)
    }

    /// Like [`Store::open`], reporting absorbed storage failures to `hook`,
    /// including those hit while loading.
    #[must_use]
    pub fn with_diagnostics(
        context: StorageContext,
        hook: impl Fn(&StorageFailure) + Send + Sync + 'static,
    ) -> Self {
        Self::build(context, Some(Box::new(hook)))
    }

    fn build(context: StorageContext, diagnostics: Option<DiagnosticHook>) -> Self {
        // Subscribe before reading so nothing written in between is missed.
        let updates = context.subscribe();

        let mut store = Self {
            context,
            updates,
            cart: ItemList::new(),
            wishlist: ItemList::new(),
            listeners: Vec::new(),
            next_listener: 0,
            diagnostics,
            unsaved: HashSet::new(),
        };

        for kind in CollectionKind::ALL {
            let loaded = match store.read(kind) {
                Ok(loaded) => loaded.unwrap_or_default(),
                Err(error) => {
                    store.report(kind, StorageOperation::Read, error);
                    ItemList::new()
                }
            };
            *store.collection_mut(kind) = loaded;
        }

        info!(
            context = %store.context.id(),
            cart = store.cart.len(),
            wishlist = store.wishlist.len(),
            "Store opened"
        );
        store
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current cart contents.
    #[must_use]
    pub const fn cart(&self) -> &ItemList {
        &self.cart
    }

    /// Current wishlist contents.
    #[must_use]
    pub const fn wishlist(&self) -> &ItemList {
        &self.wishlist
    }

    /// The collection of the given kind.
    #[must_use]
    pub const fn collection(&self, kind: CollectionKind) -> &ItemList {
        match kind {
            CollectionKind::Cart => &self.cart,
            CollectionKind::Wishlist => &self.wishlist,
        }
    }

    /// Whether the item with `id` is in the cart.
    #[must_use]
    pub fn in_cart(&self, id: ItemId) -> bool {
        self.cart.contains(id)
    }

    /// Whether the item with `id` is in the wishlist.
    #[must_use]
    pub fn in_wishlist(&self, id: ItemId) -> bool {
        self.wishlist.contains(id)
    }

    /// Item count and total for the cart.
    #[must_use]
    pub fn cart_summary(&self) -> CartSummary {
        CartSummary {
            count: self.cart.len(),
            total: self.cart.total_price(),
        }
    }

    /// The browsing context this store writes through.
    #[must_use]
    pub const fn context(&self) -> &StorageContext {
        &self.context
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append `item` to the cart unless it is already there.
    ///
    /// Returns `true` if the cart changed.
    pub fn add_to_cart(&mut self, item: Item) -> bool {
        self.add(CollectionKind::Cart, item)
    }

    /// Remove the item with `id` from the cart, if present.
    ///
    /// Returns `true` if the cart changed.
    pub fn remove_from_cart(&mut self, id: ItemId) -> bool {
        self.remove(CollectionKind::Cart, id)
    }

    /// Append `item` to the wishlist unless it is already there.
    ///
    /// Returns `true` if the wishlist changed.
    pub fn add_to_wishlist(&mut self, item: Item) -> bool {
        self.add(CollectionKind::Wishlist, item)
    }

    /// Remove the item with `id` from the wishlist, if present.
    ///
    /// Returns `true` if the wishlist changed.
    pub fn remove_from_wishlist(&mut self, id: ItemId) -> bool {
        self.remove(CollectionKind::Wishlist, id)
    }

    /// Add `item` to the cart if absent, otherwise remove it.
    ///
    /// Returns whether the item is in the cart afterwards.
    pub fn toggle_cart(&mut self, item: Item) -> bool {
        self.toggle(CollectionKind::Cart, item)
    }

    /// Add `item` to the wishlist if absent, otherwise remove it.
    ///
    /// Returns whether the item is in the wishlist afterwards.
    pub fn toggle_wishlist(&mut self, item: Item) -> bool {
        self.toggle(CollectionKind::Wishlist, item)
    }

    fn add(&mut self, kind: CollectionKind, item: Item) -> bool {
        let id = item.id;
        if !self.collection_mut(kind).insert(item) {
            debug!(%kind, item_id = %id, "Item already present");
            return false;
        }

        add_breadcrumb(
            kind.label(),
            "Added item",
            Some(&[("item_id", id.to_string().as_str())]),
        );
        self.persist(kind);
        true
    }

    fn remove(&mut self, kind: CollectionKind, id: ItemId) -> bool {
        if self.collection_mut(kind).remove(id).is_none() {
            debug!(%kind, item_id = %id, "Item not present");
            return false;
        }

        add_breadcrumb(
            kind.label(),
            "Removed item",
            Some(&[("item_id", id.to_string().as_str())]),
        );
        self.persist(kind);
        true
    }

    fn toggle(&mut self, kind: CollectionKind, item: Item) -> bool {
        let id = item.id;
        if self.collection(kind).contains(id) {
            self.remove(kind, id);
            false
        } else {
            self.add(kind, item);
            true
        }
    }

    // =========================================================================
    // Listeners & Diagnostics
    // =========================================================================

    /// Register a listener for collections replaced by other contexts.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&ExternalChange<'_>) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Replace the diagnostic hook.
    pub fn set_diagnostic_hook(&mut self, hook: impl Fn(&StorageFailure) + Send + Sync + 'static) {
        self.diagnostics = Some(Box::new(hook));
    }

    // =========================================================================
    // Cross-context Synchronization
    // =========================================================================

    /// Apply one change written by another context.
    ///
    /// Only new values for the cart or wishlist keys are considered; a value
    /// that does not parse is logged and ignored. Returns the collection that
    /// was replaced.
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> Option<CollectionKind> {
        let kind = event
            .key
            .as_deref()
            .and_then(CollectionKind::from_storage_key)?;

        let Some(raw) = event.new_value.as_deref() else {
            debug!(%kind, source = %event.source, "Ignoring removal from another context");
            return None;
        };

        match ItemList::from_json(raw) {
            Ok(items) => {
                debug!(%kind, source = %event.source, len = items.len(), "Applying external update");
                self.unsaved.remove(&kind);
                self.replace(kind, items);
                Some(kind)
            }
            Err(error) => {
                self.report(kind, StorageOperation::ExternalUpdate, error.into());
                None
            }
        }
    }

    /// Apply every change already queued by other contexts, without waiting.
    ///
    /// Returns the number of collection replacements made.
    pub fn sync_pending(&mut self) -> usize {
        let mut replaced = 0;
        while let Some(received) = self.updates.try_next() {
            replaced += match received {
                Received::Event(event) => usize::from(self.apply_storage_event(&event).is_some()),
                Received::Lagged(skipped) => self.resync(skipped).len(),
            };
        }
        replaced
    }

    /// Wait until another context changes a collection and apply it.
    ///
    /// Returns `None` if the notification channel closes.
    pub async fn next_external_change(&mut self) -> Option<CollectionKind> {
        loop {
            match self.updates.next().await? {
                Received::Event(event) => {
                    if let Some(kind) = self.apply_storage_event(&event) {
                        return Some(kind);
                    }
                }
                Received::Lagged(skipped) => {
                    if let Some(kind) = self.resync(skipped).into_iter().next() {
                        return Some(kind);
                    }
                }
            }
        }
    }

    /// Re-read both collections after missing notifications.
    ///
    /// A collection is only replaced when storage holds a different value and
    /// its last local write did not fail. Own writes count toward the lag, so
    /// most resyncs replace nothing.
    fn resync(&mut self, skipped: u64) -> Vec<CollectionKind> {
        warn!(skipped, "Missed storage notifications, re-reading collections");

        let mut replaced = Vec::new();
        for kind in CollectionKind::ALL {
            if self.unsaved.contains(&kind) {
                debug!(%kind, "Keeping unsaved collection over stored value");
                continue;
            }
            match self.read(kind) {
                Ok(Some(items)) if items == *self.collection(kind) => {}
                Ok(Some(items)) => {
                    self.replace(kind, items);
                    replaced.push(kind);
                }
                Ok(None) => {}
                Err(error) => self.report(kind, StorageOperation::Read, error),
            }
        }
        replaced
    }

    // =========================================================================
    // Storage Helpers
    // =========================================================================

    const fn collection_mut(&mut self, kind: CollectionKind) -> &mut ItemList {
        match kind {
            CollectionKind::Cart => &mut self.cart,
            CollectionKind::Wishlist => &mut self.wishlist,
        }
    }

    /// Load a collection; `None` if its key is absent.
    fn read(&self, kind: CollectionKind) -> Result<Option<ItemList>, PersistError> {
        let Some(raw) = self.context.get_item(kind.storage_key())? else {
            return Ok(None);
        };
        Ok(Some(ItemList::from_json(&raw)?))
    }

    /// Mirror a collection to storage, absorbing failures.
    fn persist(&mut self, kind: CollectionKind) {
        let result = self
            .collection(kind)
            .to_json()
            .map_err(PersistError::from)
            .and_then(|raw| {
                self.context
                    .set_item(kind.storage_key(), &raw)
                    .map_err(PersistError::from)
            });

        match result {
            Ok(()) => {
                self.unsaved.remove(&kind);
            }
            Err(error) => {
                self.unsaved.insert(kind);
                self.report(kind, StorageOperation::Write, error);
            }
        }
    }

    fn replace(&mut self, kind: CollectionKind, items: ItemList) {
        *self.collection_mut(kind) = items;

        let items = match kind {
            CollectionKind::Cart => &self.cart,
            CollectionKind::Wishlist => &self.wishlist,
        };
        let change = ExternalChange { kind, items };
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
    }

    fn report(&self, kind: CollectionKind, operation: StorageOperation, error: PersistError) {
        warn!(
            %kind,
            operation = ?operation,
            error = %error,
            "Storage failure absorbed"
        );
        if let Some(hook) = &self.diagnostics {
            hook(&StorageFailure {
                kind,
                operation,
                error,
            });
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("context", &self.context.id())
            .field("cart", &self.cart.len())
            .field("wishlist", &self.wishlist.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::test_support::item;
    use super::*;
    use crate::storage::{LocalStorage, MemoryArea, StorageArea};

    fn ids(list: &ItemList) -> Vec<i64> {
        list.iter().map(|item| item.id.as_i64()).collect()
    }

    fn failures() -> (
        Arc<Mutex<Vec<(CollectionKind, StorageOperation)>>>,
        impl Fn(&StorageFailure) + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook = move |failure: &StorageFailure| {
            sink.lock()
                .unwrap()
                .push((failure.kind, failure.operation));
        };
        (seen, hook)
    }

    /// Area whose every operation fails.
    struct BrokenArea;

    impl StorageArea for BrokenArea {
        fn get_item(&self, _: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn set_item(&self, _: &str, _: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn remove_item(&self, _: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn clear(&self) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
        fn keys(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    // =========================================================================
    // Mutation contract
    // =========================================================================

    #[test]
    fn test_cart_add_add_remove_scenario() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());

        assert!(store.add_to_cart(item(1)));
        assert!(store.add_to_cart(item(2)));
        assert!(store.remove_from_cart(ItemId::new(1)));

        assert_eq!(ids(store.cart()), vec![2]);

        let stored = storage.area().get_item(CART_KEY).unwrap().unwrap();
        let expected: ItemList = std::iter::once(item(2)).collect();
        assert_eq!(stored, expected.to_json().unwrap());
    }

    #[test]
    fn test_wishlist_same_item_twice() {
        let mut store = Store::open(LocalStorage::in_memory().context());

        assert!(store.add_to_wishlist(item(1)));
        assert!(!store.add_to_wishlist(item(1)));

        assert_eq!(store.wishlist().len(), 1);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_add_is_idempotent_for_any_cart_state() {
        for existing in [vec![], vec![1], vec![3, 1, 2]] {
            let mut store = Store::open(LocalStorage::in_memory().context());
            for id in existing {
                store.add_to_cart(item(id));
            }

            store.add_to_cart(item(1));
            let once = store.cart().clone();
            store.add_to_cart(item(1));

            assert_eq!(store.cart(), &once);
        }
    }

    #[test]
    fn test_noop_mutations_do_not_write() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());
        store.add_to_cart(item(1));

        let mut other_tab = storage.context().subscribe();
        assert!(!store.add_to_cart(item(1)));
        assert!(!store.remove_from_cart(ItemId::new(99)));
        assert!(!store.remove_from_wishlist(ItemId::new(1)));

        assert!(other_tab.try_next().is_none());
        assert_eq!(ids(store.cart()), vec![1]);
    }

    #[test]
    fn test_uniqueness_after_many_adds() {
        let mut store = Store::open(LocalStorage::in_memory().context());
        for id in [1, 2, 1, 3, 2, 2, 4, 1] {
            store.add_to_cart(item(id));
        }
        assert_eq!(ids(store.cart()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_order_preserved_across_interleaving() {
        let mut store = Store::open(LocalStorage::in_memory().context());
        store.add_to_cart(item(5));
        store.add_to_cart(item(3));
        store.add_to_cart(item(8));
        store.remove_from_cart(ItemId::new(3));
        store.add_to_cart(item(1));
        store.add_to_cart(item(3));
        store.remove_from_cart(ItemId::new(5));

        assert_eq!(ids(store.cart()), vec![8, 1, 3]);
    }

    #[test]
    fn test_toggle_and_membership() {
        let mut store = Store::open(LocalStorage::in_memory().context());

        assert!(store.toggle_wishlist(item(4)));
        assert!(store.in_wishlist(ItemId::new(4)));
        assert!(!store.toggle_wishlist(item(4)));
        assert!(!store.in_wishlist(ItemId::new(4)));

        assert!(store.toggle_cart(item(2)));
        assert!(store.in_cart(ItemId::new(2)));
        assert!(!store.in_wishlist(ItemId::new(2)));
    }

    #[test]
    fn test_cart_summary() {
        let mut store = Store::open(LocalStorage::in_memory().context());
        store.add_to_cart(item(1));
        store.add_to_cart(item(3));

        let summary = store.cart_summary();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total.display(), "$6.00");
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn test_reopen_restores_collections() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());
        store.add_to_cart(item(2));
        store.add_to_cart(item(1));
        store.add_to_wishlist(item(7));
        store.remove_from_cart(ItemId::new(2));
        store.add_to_cart(item(9));

        let reopened = Store::open(storage.context());
        assert_eq!(reopened.cart(), store.cart());
        assert_eq!(reopened.wishlist(), store.wishlist());
    }

    #[test]
    fn test_corrupt_storage_opens_empty() {
        let storage = LocalStorage::in_memory();
        storage.area().set_item(CART_KEY, "{definitely not json").unwrap();
        storage.area().set_item(WISHLIST_KEY, r#"[{"id":1}]"#).unwrap();

        let (seen, hook) = failures();
        let store = Store::with_diagnostics(storage.context(), hook);

        assert!(store.cart().is_empty());
        assert!(store.wishlist().is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (CollectionKind::Cart, StorageOperation::Read),
                (CollectionKind::Wishlist, StorageOperation::Read)
            ]
        );

        // Opening leaves the stored value alone.
        assert_eq!(
            storage.area().get_item(CART_KEY).unwrap().as_deref(),
            Some("{definitely not json")
        );
    }

    #[test]
    fn test_unreadable_storage_opens_empty_and_mutations_succeed() {
        let storage = LocalStorage::new(Arc::new(BrokenArea));
        let (seen, hook) = failures();
        let mut store = Store::with_diagnostics(storage.context(), hook);

        assert!(store.cart().is_empty());
        assert!(store.add_to_cart(item(1)));
        assert_eq!(ids(store.cart()), vec![1]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], (CollectionKind::Cart, StorageOperation::Write));
    }

    #[test]
    fn test_quota_exceeded_keeps_memory_authoritative() {
        let storage = LocalStorage::new(Arc::new(MemoryArea::with_quota(250)));
        let (seen, hook) = failures();
        let mut store = Store::with_diagnostics(storage.context(), hook);

        store.add_to_cart(item(1));
        let stored_before = storage.area().get_item(CART_KEY).unwrap();
        assert!(stored_before.is_some());

        // The second item no longer fits, the cart still takes it.
        assert!(store.add_to_cart(item(2)));
        assert_eq!(ids(store.cart()), vec![1, 2]);
        assert_eq!(storage.area().get_item(CART_KEY).unwrap(), stored_before);
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&(CollectionKind::Cart, StorageOperation::Write))
        );
    }

    // =========================================================================
    // Cross-context synchronization
    // =========================================================================

    #[test]
    fn test_external_update_replaces_collection() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());
        store.add_to_cart(item(1));

        let other_tab = storage.context();
        let theirs: ItemList = [3, 4].into_iter().map(item).collect();
        other_tab
            .set_item(CART_KEY, &theirs.to_json().unwrap())
            .unwrap();

        assert_eq!(store.sync_pending(), 1);
        assert_eq!(store.cart(), &theirs);
        assert!(store.wishlist().is_empty());
    }

    #[test]
    fn test_malformed_external_update_is_ignored() {
        let storage = LocalStorage::in_memory();
        let (seen, hook) = failures();
        let mut store = Store::with_diagnostics(storage.context(), hook);
        store.add_to_wishlist(item(1));
        let before = store.wishlist().clone();

        storage
            .context()
            .set_item(WISHLIST_KEY, "[{\"id\":")
            .unwrap();

        assert_eq!(store.sync_pending(), 0);
        assert_eq!(store.wishlist(), &before);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(CollectionKind::Wishlist, StorageOperation::ExternalUpdate)]
        );
    }

    #[test]
    fn test_removals_and_unrelated_keys_are_ignored() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());
        store.add_to_cart(item(1));

        let other_tab = storage.context();
        other_tab.set_item("shopflow-ui-theme", "dark").unwrap();
        other_tab.remove_item(CART_KEY).unwrap();
        other_tab.clear().unwrap();

        assert_eq!(store.sync_pending(), 0);
        assert_eq!(ids(store.cart()), vec![1]);
    }

    #[test]
    fn test_listeners_receive_validated_value() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = store.subscribe(move |change| {
            sink.lock()
                .unwrap()
                .push((change.kind, change.items.len()));
        });

        let other_tab = storage.context();
        let theirs: ItemList = [1, 2].into_iter().map(item).collect();
        other_tab
            .set_item(WISHLIST_KEY, &theirs.to_json().unwrap())
            .unwrap();
        other_tab.set_item(CART_KEY, "garbage").unwrap();
        store.sync_pending();

        assert_eq!(*seen.lock().unwrap(), vec![(CollectionKind::Wishlist, 2)]);

        assert!(store.unsubscribe(listener));
        assert!(!store.unsubscribe(listener));
        other_tab.set_item(WISHLIST_KEY, "[]").unwrap();
        store.sync_pending();
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(store.wishlist().is_empty());
    }

    #[test]
    fn test_two_stores_converge() {
        let storage = LocalStorage::in_memory();
        let mut first = Store::open(storage.context());
        let mut second = Store::open(storage.context());

        first.add_to_cart(item(1));
        second.sync_pending();
        second.add_to_cart(item(2));
        first.sync_pending();

        assert_eq!(ids(first.cart()), vec![1, 2]);
        assert_eq!(first.cart(), second.cart());

        // Own writes are never echoed back.
        assert_eq!(second.sync_pending(), 0);
    }

    #[test]
    fn test_last_writer_wins() {
        let storage = LocalStorage::in_memory();
        let mut first = Store::open(storage.context());
        let mut second = Store::open(storage.context());

        first.add_to_cart(item(1));
        second.add_to_cart(item(2));

        first.sync_pending();
        second.sync_pending();

        // Each adopted the other's write: no merge.
        assert_eq!(ids(first.cart()), vec![2]);
        assert_eq!(ids(second.cart()), vec![1]);
    }

    #[test]
    fn test_lagged_subscription_resyncs_from_storage() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());
        let mut other = Store::open(storage.context());

        for id in 1..=100 {
            other.add_to_cart(item(id));
        }
        other.remove_from_cart(ItemId::new(50));

        assert!(store.sync_pending() >= 1);
        assert_eq!(store.cart(), other.cart());
    }

    #[test]
    fn test_own_writes_overflowing_channel_notify_nobody() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());

        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        store.subscribe(move |_| *sink.lock().unwrap() += 1);

        for id in 1..=70 {
            store.add_to_cart(item(id));
        }

        assert_eq!(store.sync_pending(), 0);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(store.cart().len(), 70);
    }

    #[test]
    fn test_resync_keeps_collection_whose_write_failed() {
        let storage = LocalStorage::new(Arc::new(MemoryArea::with_quota(250)));
        let (seen, hook) = failures();
        let mut store = Store::with_diagnostics(storage.context(), hook);

        store.add_to_cart(item(1));
        store.add_to_cart(item(2));
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&(CollectionKind::Cart, StorageOperation::Write))
        );

        // Enough unrelated writes from another tab to overflow the channel.
        let other = storage.context();
        for i in 0..70 {
            other.set_item("theme", &format!("v{i}")).unwrap();
        }

        assert_eq!(store.sync_pending(), 0);
        assert_eq!(ids(store.cart()), vec![1, 2]);
    }

    #[test]
    fn test_external_update_supersedes_failed_write() {
        let storage = LocalStorage::new(Arc::new(MemoryArea::with_quota(250)));
        let mut store = Store::open(storage.context());
        store.add_to_cart(item(1));
        store.add_to_cart(item(2));

        let other = storage.context();
        let theirs: ItemList = std::iter::once(item(3)).collect();
        other.set_item(CART_KEY, &theirs.to_json().unwrap()).unwrap();
        assert_eq!(store.sync_pending(), 1);
        assert_eq!(ids(store.cart()), vec![3]);

        // Storage and memory agree again, so a later resync has nothing to do.
        for i in 0..70 {
            other.set_item("theme", &format!("v{i}")).unwrap();
        }
        assert_eq!(store.sync_pending(), 0);
        assert_eq!(ids(store.cart()), vec![3]);
    }

    #[tokio::test]
    async fn test_next_external_change_waits_for_other_context() {
        let storage = LocalStorage::in_memory();
        let mut store = Store::open(storage.context());
        let other_tab = storage.context();

        let writer = tokio::spawn(async move {
            other_tab.set_item("unrelated", "x").unwrap();
            other_tab.set_item(CART_KEY, "not json").unwrap();
            let theirs: ItemList = std::iter::once(item(6)).collect();
            other_tab
                .set_item(CART_KEY, &theirs.to_json().unwrap())
                .unwrap();
        });

        assert_eq!(store.next_external_change().await, Some(CollectionKind::Cart));
        assert_eq!(ids(store.cart()), vec![6]);
        writer.await.unwrap();
    }
}
