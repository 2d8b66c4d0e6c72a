//! HTTP API for administering configuration records and inspecting the cache.

pub mod handlers;

use crate::{cache::ConfigCache, errors::Error};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

use self::handlers::*;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub cache: Arc<ConfigCache>,
}

impl AppState {
    #[must_use]
    pub const fn new(cache: Arc<ConfigCache>) -> Self {
        Self { cache }
    }
}

pub fn setup_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/configurations",
            get(list_configurations).post(create_configuration),
        )
        .route(
            "/api/configurations/{id}",
            get(get_configuration)
                .put(update_configuration)
                .delete(delete_configuration),
        )
        .route("/api/configurations/value/{name}", get(get_value))
        .route("/api/cache", get(get_cache))
        .route("/api/cache/reload", post(reload_cache))
        .with_state(state)
}

impl Error {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateName { .. } => StatusCode::CONFLICT,
            Self::Conversion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) | Self::Config { .. } | Self::Io(_) | Self::Server { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
