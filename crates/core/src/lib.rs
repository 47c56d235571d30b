//! Shopflow Core - Shared catalog types.
//!
//! This crate provides the types shared by every Shopflow component:
//! - `storefront` - Catalog client, cart/wishlist store and browse helpers
//! - `integration-tests` - Cross-crate scenarios
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Item records, type-safe IDs, prices and ratings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
