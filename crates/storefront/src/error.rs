//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for everything the storefront surfaces to
//! a shopper. [`AppError::report`] captures failures to Sentry; the shopper only
//! ever sees [`AppError::user_message`].

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Shown whenever the catalog cannot be loaded.
pub const CATALOG_UNAVAILABLE_MESSAGE: &str =
    "We couldn't load the products. Please check your connection and try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog request failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage medium could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    /// Message safe to show a shopper.
    ///
    /// Internal error details are never exposed.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Catalog(_) => CATALOG_UNAVAILABLE_MESSAGE,
            Self::HttpClient(_) | Self::Config(_) => "The store is not configured correctly.",
            Self::Storage(_) => "Your cart and wishlist could not be loaded.",
        }
    }

    /// Whether retrying the same action can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog(_))
    }

    /// Capture the error to Sentry and log it.
    pub fn report(&self) {
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("item_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
