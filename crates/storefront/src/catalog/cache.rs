//! Cache types for catalog API responses.

use shopflow_core::{Item, ItemId};

/// Cache key, one per request shape.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Items,
    Item(ItemId),
    Categories,
    Category(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Items(Vec<Item>),
    Item(Box<Item>),
    Categories(Vec<String>),
}
