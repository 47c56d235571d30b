//! Read-only client for the remote product catalog.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest`; the catalog is the source of truth
//! - In-memory caching via `moka` for successful responses (5 minute TTL by default)
//! - Every failure is reported as one [`CatalogError`]; callers offer a manual
//!   retry, after [`CatalogClient::invalidate_all`] if fresh data is wanted
//!
//! # Endpoints
//!
//! ```text
//! GET /products                     - all items
//! GET /products/{id}                - one item
//! GET /products/categories          - category labels
//! GET /products/category/{category} - items in one category
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use shopflow_storefront::catalog::CatalogClient;
//!
//! let client = CatalogClient::new(&config.catalog)?;
//!
//! let categories = client.list_categories().await?;
//! let jewelery = client.list_items_in_category(&categories[1]).await?;
//! let item = client.get_item(ItemId::new(1)).await?;
//! ```

mod cache;

use std::sync::Arc;

use moka::future::Cache;
use serde::de::DeserializeOwned;
use shopflow_core::{Item, ItemId};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::CatalogConfig;

use cache::{CacheKey, CacheValue};

/// A catalog request failed.
///
/// Callers see a single condition; the source carries the transport, status,
/// or decoding detail for logs.
#[derive(Debug, Error)]
#[error("failed to fetch {resource}")]
pub struct CatalogError {
    resource: String,
    #[source]
    cause: FetchCause,
}

impl CatalogError {
    /// What was being fetched (e.g., "products").
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// Underlying reason a fetch failed.
#[derive(Debug, Error)]
pub enum FetchCause {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot take path segments.
    #[error("base URL cannot be extended: {0}")]
    BaseUrl(Url),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the catalog REST API.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shopflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// The catalog root requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Drop every cached response so the next calls hit the catalog.
    pub fn invalidate_all(&self) {
        debug!("Invalidating catalog cache");
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Item Methods
    // =========================================================================

    /// Fetch every item in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not decode.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        let cache_key = CacheKey::Items;

        if let Some(CacheValue::Items(items)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for items");
            return Ok(items);
        }

        let items: Vec<Item> = self.fetch("products", &["products"]).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Items(items.clone()))
            .await;

        Ok(items)
    }

    /// Fetch one item by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the item does not exist.
    #[instrument(skip(self))]
    pub async fn get_item(&self, id: ItemId) -> Result<Item, CatalogError> {
        let cache_key = CacheKey::Item(id);

        if let Some(CacheValue::Item(item)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for item");
            return Ok(*item);
        }

        let item: Item = self
            .fetch(&format!("product {id}"), &["products", &id.to_string()])
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Item(Box::new(item.clone())))
            .await;

        Ok(item)
    }

    /// Fetch the category labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not decode.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<String>, CatalogError> {
        let cache_key = CacheKey::Categories;

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<String> = self
            .fetch("categories", &["products", "categories"])
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Fetch the items in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not decode.
    #[instrument(skip(self))]
    pub async fn list_items_in_category(&self, category: &str) -> Result<Vec<Item>, CatalogError> {
        let cache_key = CacheKey::Category(category.to_string());

        if let Some(CacheValue::Items(items)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(items);
        }

        let items: Vec<Item> = self
            .fetch(
                &format!("products in category '{category}'"),
                &["products", "category", category],
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Items(items.clone()))
            .await;

        Ok(items)
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    /// GET `{base_url}/{segments...}` and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        resource: &str,
        segments: &[&str],
    ) -> Result<T, CatalogError> {
        self.get_json(segments).await.map_err(|cause| CatalogError {
            resource: resource.to_string(),
            cause,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, FetchCause> {
        let url = self.endpoint(segments)?;

        let response = self.inner.client.get(url.clone()).send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                %url,
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Catalog returned non-success status"
            );
            return Err(FetchCause::Status(status));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                %url,
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            FetchCause::Parse(e)
        })
    }

    /// Build a request URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchCause> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchCause::BaseUrl(self.inner.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish()
    }
}
