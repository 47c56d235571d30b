//! Application state created once at startup.

use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::storage::{FileArea, LocalStorage, MemoryArea, StorageArea};
use crate::store::Store;

/// Everything a storefront session needs.
///
/// The catalog client and storage medium are cheaply cloneable; the store is
/// owned here and borrowed by views.
#[derive(Debug)]
pub struct AppState {
    config: StorefrontConfig,
    catalog: CatalogClient,
    storage: LocalStorage,
    store: Store,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Storage is file-backed when `config.storage.dir` is set and in-memory
    /// otherwise. The store is opened on a fresh browsing context.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the storage
    /// directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let catalog = CatalogClient::new(&config.catalog)?;

        let quota = Some(config.storage.quota_bytes);
        let area: Arc<dyn StorageArea> = match &config.storage.dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "Using file-backed storage");
                Arc::new(FileArea::open(dir, quota)?)
            }
            None => {
                tracing::info!("Using in-memory storage");
                Arc::new(MemoryArea::with_quota(config.storage.quota_bytes))
            }
        };
        let storage = LocalStorage::new(area);
        let store = Store::open(storage.context());

        Ok(Self {
            config,
            catalog,
            storage,
            store,
        })
    }

    /// Get the storefront configuration.
    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Get the catalog client.
    #[must_use]
    pub const fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    /// Get the storage medium, e.g. to open further browsing contexts.
    #[must_use]
    pub const fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}
