//! Identifier-unique, insertion-ordered item collections.

use core::fmt;

use serde::{Deserialize, Serialize};
use shopflow_core::{Item, ItemId, Price};
use tracing::warn;

/// Storage key holding the serialized cart.
pub const CART_KEY: &str = "shopflow_cart_v1";
/// Storage key holding the serialized wishlist.
pub const WISHLIST_KEY: &str = "shopflow_wishlist_v1";

/// The collections a store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Cart,
    Wishlist,
}

impl CollectionKind {
    /// Every collection, in a fixed order.
    pub const ALL: [Self; 2] = [Self::Cart, Self::Wishlist];

    /// Storage key this collection is mirrored to.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Cart => CART_KEY,
            Self::Wishlist => WISHLIST_KEY,
        }
    }

    /// Collection mirrored to `key`, if any.
    #[must_use]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.storage_key() == key)
    }

    /// Short name for logs and breadcrumbs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered list of items with at most one entry per identifier.
///
/// Serializes as a plain JSON array of items. Building a list from items
/// (including deserializing one) keeps the first occurrence of each id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList {
    #[serde(deserialize_with = "deserialize_unique")]
    items: Vec<Item>,
}

impl ItemList {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parse a serialized list.
    ///
    /// Duplicate identifiers are collapsed to their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not a JSON array of items.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<Item> = serde_json::from_str(raw)?;
        let total = items.len();
        let list: Self = items.into_iter().collect();

        if list.len() < total {
            warn!(
                duplicates = total - list.len(),
                "Collapsed duplicate items in stored collection"
            );
        }
        Ok(list)
    }

    /// Serialize the list.
    ///
    /// # Errors
    ///
    /// Returns an error if an item cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Items in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether an item with `id` is present.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Append `item` unless its id is already present.
    ///
    /// Returns `true` if the item was added.
    pub fn insert(&mut self, item: Item) -> bool {
        if self.contains(item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove the item with `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Sum of the unit prices.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(|item| item.price).sum()
    }
}

impl FromIterator<Item> for ItemList {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.insert(item);
        }
        list
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn deserialize_unique<'de, D>(deserializer: D) -> Result<Vec<Item>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items = Vec::<Item>::deserialize(deserializer)?;
    Ok(items.into_iter().collect::<ItemList>().items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::test_support::item;

    fn ids(list: &ItemList) -> Vec<i64> {
        list.iter().map(|item| item.id.as_i64()).collect()
    }

    #[test]
    fn test_storage_keys_round_trip() {
        for kind in CollectionKind::ALL {
            assert_eq!(CollectionKind::from_storage_key(kind.storage_key()), Some(kind));
        }
        assert_eq!(CollectionKind::from_storage_key("shopflow-ui-theme"), None);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut list = ItemList::new();
        assert!(list.insert(item(1)));
        let once = list.clone();
        assert!(!list.insert(item(1)));
        assert_eq!(list, once);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut list: ItemList = [1, 2, 3, 4].into_iter().map(item).collect();
        assert_eq!(list.remove(ItemId::new(2)).map(|i| i.id), Some(ItemId::new(2)));
        assert!(list.remove(ItemId::new(2)).is_none());
        list.insert(item(5));
        assert_eq!(ids(&list), vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_collect_keeps_first_occurrence() {
        let mut duplicate = item(1);
        duplicate.title = "Second copy".to_string();

        let list: ItemList = vec![item(1), item(2), duplicate].into_iter().collect();
        assert_eq!(ids(&list), vec![1, 2]);
        assert_eq!(list.get(ItemId::new(1)).unwrap().title, "Item 1");
    }

    #[test]
    fn test_json_is_plain_array() {
        let list: ItemList = [2, 1].into_iter().map(item).collect();
        let json = list.to_json().unwrap();
        assert!(json.starts_with("[{\"id\":2,"));
        assert_eq!(ItemList::from_json(&json).unwrap(), list);
    }

    #[test]
    fn test_from_json_rejects_wrong_shape() {
        assert!(ItemList::from_json("{not json").is_err());
        assert!(ItemList::from_json(r#"{"id":1}"#).is_err());
        assert!(ItemList::from_json(r#"[{"id":1}]"#).is_err());
        assert!(ItemList::from_json("null").is_err());
        assert!(ItemList::from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_from_json_collapses_duplicates() {
        let raw = format!(
            "[{},{}]",
            serde_json::to_string(&item(7)).unwrap(),
            serde_json::to_string(&item(7)).unwrap()
        );
        assert_eq!(ids(&ItemList::from_json(&raw).unwrap()), vec![7]);

        let direct: ItemList = serde_json::from_str(&raw).unwrap();
        assert_eq!(direct.len(), 1);
    }

    #[test]
    fn test_total_price() {
        let list: ItemList = [1, 2, 3].into_iter().map(item).collect();
        // test items cost id * $1.50
        assert_eq!(list.total_price().display(), "$9.00");
        assert_eq!(ItemList::new().total_price().display(), "$0.00");
    }
}
