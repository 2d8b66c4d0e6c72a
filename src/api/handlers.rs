use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    core::configuration as service,
    errors::{Error, Result},
    models::ConfigurationRecord,
};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Case-insensitive name fragment
    pub name: Option<String>,
    pub application_name: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ValueResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: serde_json::Value,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CacheSummary {
    pub application_name: String,
    pub loaded_at: Option<DateTime<Utc>>,
    pub count: usize,
    pub records: Vec<ConfigurationRecord>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

fn record_not_found(id: i64) -> Error {
    Error::NotFound {
        name: format!("#{id}"),
    }
}

pub async fn list_configurations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ConfigurationRecord>>> {
    let store = state.cache.store().as_ref();
    let records = match query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(fragment) => {
            let mut found = service::search_configurations_by_name(store, fragment.trim()).await?;
            if let Some(app) = query.application_name.as_deref() {
                found.retain(|r| r.application_name == app);
            }
            found
        }
        None => service::list_configurations(store, query.application_name.as_deref()).await?,
    };
    Ok(Json(records))
}

pub async fn get_configuration(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ConfigurationRecord>> {
    service::get_configuration_by_id(state.cache.store().as_ref(), id)
        .await?
        .map(Json)
        .ok_or_else(|| record_not_found(id))
}

/// Typed value of an active record from the cache, converted by its declared type.
pub async fn get_value(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ValueResponse>> {
    let (record, value) = state.cache.get_with_record::<serde_json::Value>(&name)?;
    Ok(Json(ValueResponse {
        name: record.name,
        value_type: record.value_type,
        value,
    }))
}

pub async fn create_configuration(
    State(state): State<AppState>,
    Json(record): Json<ConfigurationRecord>,
) -> Result<impl IntoResponse> {
    let saved = service::create_configuration(state.cache.store().as_ref(), record).await?;
    state.cache.reload().await;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_configuration(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(record): Json<ConfigurationRecord>,
) -> Result<Json<ConfigurationRecord>> {
    let updated = service::update_configuration(state.cache.store().as_ref(), id, record)
        .await?
        .ok_or_else(|| record_not_found(id))?;
    state.cache.reload().await;
    Ok(Json(updated))
}

pub async fn delete_configuration(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    if !service::delete_configuration(state.cache.store().as_ref(), id).await? {
        return Err(record_not_found(id));
    }
    state.cache.reload().await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheSummary> {
    let snapshot = state.cache.snapshot();
    Json(CacheSummary {
        application_name: state.cache.application_name().to_string(),
        loaded_at: snapshot.loaded_at(),
        count: snapshot.len(),
        records: state.cache.records(),
    })
}

pub async fn reload_cache(State(state): State<AppState>) -> Json<ReloadResponse> {
    let reloaded = state.cache.reload().await;
    Json(ReloadResponse {
        reloaded,
        count: state.cache.len(),
        loaded_at: state.cache.loaded_at(),
    })
}
