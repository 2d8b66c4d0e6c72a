//! Store client - the query contract the reader needs from its backing store.
//!
//! The cache, the reconciler and the record service only ever talk to a
//! [`ConfigurationStore`]; [`SeaOrmStore`] is the shipped implementation.

mod sea_orm_store;

pub use sea_orm_store::SeaOrmStore;

use crate::errors::Result;
use crate::models::ConfigurationRecord;
use async_trait::async_trait;

/// Conjunction of optional equality and substring clauses over configuration records.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub application_name: Option<String>,
    pub is_active: Option<bool>,
    /// Substring match on `name`, ignoring ASCII case only (as SQLite's `LOWER` and `LIKE` do);
    /// non-ASCII letters must match exactly
    pub name_contains: Option<String>,
}

impl RecordFilter {
    /// Matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn application(mut self, application_name: impl Into<String>) -> Self {
        self.application_name = Some(application_name.into());
        self
    }

    #[must_use]
    pub const fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    #[must_use]
    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Evaluates the filter against a record in memory.
    ///
    /// Stores that cannot push a clause down to their query language use this to finish the
    /// match; it is also the reference semantics for every implementation.
    #[must_use]
    pub fn matches(&self, record: &ConfigurationRecord) -> bool {
        self.id.is_none_or(|id| record.id == Some(id))
            && self.name.as_deref().is_none_or(|name| record.name == name)
            && self
                .application_name
                .as_deref()
                .is_none_or(|app| record.application_name == app)
            && self.is_active.is_none_or(|active| record.is_active == active)
            && self.name_contains.as_deref().is_none_or(|fragment| {
                record
                    .name
                    .to_ascii_lowercase()
                    .contains(&fragment.to_ascii_lowercase())
            })
    }
}

/// Queryable collection of configuration records.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Returns every record matching `filter`, in insertion order.
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<ConfigurationRecord>>;

    /// Persists a new record and returns it with its assigned id.
    async fn insert_one(&self, record: ConfigurationRecord) -> Result<ConfigurationRecord>;

    /// Replaces every field of the record with `id`; returns `false` when no record matched.
    async fn replace_one(&self, id: i64, record: ConfigurationRecord) -> Result<bool>;
}
