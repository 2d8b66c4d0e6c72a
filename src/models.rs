//! Domain types shared by the store, the cache and the HTTP API.

use crate::entities::configuration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single named, typed configuration entry scoped to one application.
///
/// Serialized with camelCase keys and the type tag under `"type"`, which is the shape the
/// HTTP API accepts and returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRecord {
    /// Store-assigned identifier, `None` until persisted
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub application_name: String,
    /// Declared type tag, interpreted by [`crate::core::convert::ValueType`]
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_time: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

impl ConfigurationRecord {
    /// Creates an unsaved, active record stamped with the current time.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        application_name: impl Into<String>,
        value_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            application_name: application_name.into(),
            value_type: value_type.into(),
            value: value.into(),
            is_active: true,
            created_time: Utc::now(),
        }
    }
}

impl From<configuration::Model> for ConfigurationRecord {
    fn from(model: configuration::Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            application_name: model.application_name,
            value_type: model.value_type,
            value: model.value,
            is_active: model.is_active,
            created_time: model.created_time,
        }
    }
}
