//! Core types for Shopflow.
//!
//! This module provides the catalog record and the type-safe wrappers it is
//! built from.

pub mod id;
pub mod item;
pub mod price;
pub mod rating;

pub use id::*;
pub use item::Item;
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError, StarFill};
