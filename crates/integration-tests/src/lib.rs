//! Integration tests for Shopflow.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopflow-integration-tests
//! ```
//!
//! No external services are needed: the catalog is served by [`MockCatalog`]
//! on an ephemeral local port and storage lives in memory or a temp dir.
//!
//! # Test Categories
//!
//! - `store_sync` - Cart/wishlist persistence across contexts and restarts
//! - `catalog_flow` - Catalog client against the mock, feeding the store

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

/// Categories served by the mock, in catalog order.
pub const CATEGORIES: [&str; 4] = [
    "electronics",
    "jewelery",
    "men's clothing",
    "women's clothing",
];

/// A local stand-in for the public catalog API.
#[derive(Clone)]
pub struct MockCatalog {
    base_url: Url,
    requests: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct MockState {
    products: Arc<Vec<Value>>,
    requests: Arc<AtomicUsize>,
    failing: bool,
}

impl MockCatalog {
    /// Serve 20 products (five per category) on `127.0.0.1`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Serve a catalog that answers every request with a 500.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start_failing() -> Self {
        Self::spawn(true).await
    }

    #[allow(clippy::unwrap_used)]
    async fn spawn(failing: bool) -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            products: Arc::new((1..=20).map(product).collect()),
            requests: Arc::clone(&requests),
            failing,
        };

        let app = Router::new()
            .route("/products", get(list_products))
            .route("/products/categories", get(list_categories))
            .route("/products/category/{category}", get(list_in_category))
            .route("/products/{id}", get(get_product))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            requests,
        }
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Requests served so far.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Catalog record for product `id`, shaped like the public API's.
#[must_use]
pub fn product(id: i64) -> Value {
    let category = CATEGORIES
        .get(usize::try_from(id).unwrap_or(0) % CATEGORIES.len())
        .copied()
        .unwrap_or("electronics");

    #[allow(clippy::cast_precision_loss)]
    let price = id as f64 * 10.0 + 0.99;

    json!({
        "id": id,
        "title": format!("Product {id}"),
        "price": price,
        "description": format!("Description of product {id}"),
        "category": category,
        "image": format!("https://fakestoreapi.com/img/{id}.jpg"),
        "rating": { "rate": 3.5, "count": 120 }
    })
}

fn served(state: &MockState) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    state
        .failing
        .then(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn list_products(State(state): State<MockState>) -> Response {
    if let Some(failure) = served(&state) {
        return failure;
    }
    Json(state.products.as_slice()).into_response()
}

async fn list_categories(State(state): State<MockState>) -> Response {
    if let Some(failure) = served(&state) {
        return failure;
    }
    Json(CATEGORIES).into_response()
}

async fn list_in_category(
    State(state): State<MockState>,
    Path(category): Path<String>,
) -> Response {
    if let Some(failure) = served(&state) {
        return failure;
    }
    let matching: Vec<&Value> = state
        .products
        .iter()
        .filter(|p| p["category"] == category.as_str())
        .collect();
    Json(matching).into_response()
}

async fn get_product(State(state): State<MockState>, Path(id): Path<i64>) -> Response {
    if let Some(failure) = served(&state) {
        return failure;
    }
    state
        .products
        .iter()
        .find(|p| p["id"] == id)
        .map_or_else(|| StatusCode::OK.into_response(), |p| Json(p).into_response())
}
