//! Shared utilities for integration tests.
#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use config_reader::{
    CacheOptions, ConfigCache,
    api::{AppState, setup_router},
    config::database,
    store::SeaOrmStore,
};
use std::sync::Arc;
use tower::ServiceExt;

pub const APPLICATION: &str = "SERVICE-A";

/// Builds a cache for [`APPLICATION`] over a fresh in-memory database.
pub async fn setup_cache() -> Arc<ConfigCache> {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    database::create_tables(&db).await.unwrap();
    let store = Arc::new(SeaOrmStore::new(db));
    Arc::new(
        ConfigCache::connect(store, APPLICATION, CacheOptions::default())
            .await
            .unwrap(),
    )
}

pub fn router(cache: Arc<ConfigCache>) -> Router {
    setup_router(AppState::new(cache))
}

/// Sends one request through the router and decodes the JSON body, if any.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
