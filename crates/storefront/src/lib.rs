//! Shopflow Storefront library.
//!
//! Client-side storefront: a read-only catalog client plus a persistent
//! cart/wishlist store kept in sync across browsing contexts.
//!
//! # Modules
//!
//! - [`catalog`] - REST client for the product catalog, with response caching
//! - [`store`] - Cart and wishlist mirrored to storage
//! - [`storage`] - Origin-scoped key/value storage and change events
//! - [`browse`] - Filtering, paging and summaries for listings
//! - [`state`] - Application state created once at startup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod browse;
pub mod catalog;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod store;
pub mod telemetry;
