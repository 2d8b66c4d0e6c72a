//! Per-application configuration cache.
//!
//! Readers see an immutable [`Snapshot`] published through an [`ArcSwap`], so a lookup is a
//! pointer load plus a hash probe and never waits on a reload. A reload builds the next
//! snapshot privately and publishes it with a single store. Reloads are serialized by one
//! async mutex: [`ConfigCache::reload`] waits its turn, [`ConfigCache::try_reload`] gives up
//! immediately when another reload holds the gate.

use crate::{
    core::convert::convert,
    errors::{Error, Result},
    models::ConfigurationRecord,
    store::{ConfigurationStore, RecordFilter},
};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Tuning knobs for [`ConfigCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Keep the current snapshot when a successful fetch returns no rows while the cache still
    /// holds records. Off by default: a reload normally mirrors the store exactly.
    pub retain_on_empty: bool,
}

/// The complete name → record mapping visible to readers at one point in time.
#[derive(Debug, Default)]
pub struct Snapshot {
    records: HashMap<String, ConfigurationRecord>,
    loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn build(records: Vec<ConfigurationRecord>, filter: &RecordFilter) -> Self {
        let mut map = HashMap::with_capacity(records.len());
        for record in records.into_iter().filter(|r| filter.matches(r)) {
            // Later rows win if the store ever holds duplicate active names
            map.insert(record.name.clone(), record);
        }
        Self {
            records: map,
            loaded_at: Some(Utc::now()),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConfigurationRecord> {
        self.records.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When this snapshot was fetched; `None` before the first successful load.
    #[must_use]
    pub const fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

/// Read-optimized cache of one application's active configuration records.
pub struct ConfigCache {
    application_name: String,
    store: Arc<dyn ConfigurationStore>,
    snapshot: ArcSwap<Snapshot>,
    reload_gate: Mutex<()>,
    options: CacheOptions,
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("application_name", &self.application_name)
            .field("records", &self.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ConfigCache {
    /// Creates the cache for `application_name` and performs the initial load.
    ///
    /// A failing initial load is logged and leaves the cache empty; the next reload retries.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if `application_name` is empty.
    pub async fn connect(
        store: Arc<dyn ConfigurationStore>,
        application_name: impl Into<String>,
        options: CacheOptions,
    ) -> Result<Self> {
        let application_name = application_name.into();
        if application_name.trim().is_empty() {
            return Err(Error::Validation {
                message: "Application name cannot be empty".to_string(),
            });
        }

        let cache = Self {
            application_name,
            store,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            reload_gate: Mutex::new(()),
            options,
        };
        cache.reload().await;
        Ok(cache)
    }

    /// Application whose records this cache holds.
    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// The store this cache loads from.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn ConfigurationStore> {
        &self.store
    }

    /// Fetches the application's active records and publishes them as the new snapshot,
    /// waiting for any reload already in progress to finish first.
    ///
    /// Returns `true` when a new snapshot was installed. Store failures are logged and keep
    /// the previous snapshot.
    pub async fn reload(&self) -> bool {
        let _gate = self.reload_gate.lock().await;
        self.load().await
    }

    /// Like [`reload`](Self::reload), but returns `None` without doing anything when another
    /// reload is already running.
    pub async fn try_reload(&self) -> Option<bool> {
        let Ok(_gate) = self.reload_gate.try_lock() else {
            debug!(application = %self.application_name, "Reload already in progress, skipping");
            return None;
        };
        Some(self.load().await)
    }

    #[instrument(skip(self), fields(application = %self.application_name))]
    async fn load(&self) -> bool {
        let filter = RecordFilter::new()
            .application(self.application_name.as_str())
            .active(true);

        let records = match self.store.find(&filter).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to load configurations from storage: {}", e);
                return false;
            }
        };

        if records.is_empty() && self.options.retain_on_empty && !self.snapshot.load().is_empty()
        {
            warn!("Store returned no configurations, keeping the previous snapshot");
            return false;
        }

        let next = Snapshot::build(records, &filter);
        info!(count = next.len(), "Loaded configurations");
        self.snapshot.store(Arc::new(next));
        true
    }

    /// The record currently cached under `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ConfigurationRecord> {
        self.snapshot.load().get(name).cloned()
    }

    /// Reads `name` from the current snapshot and converts it to `T`.
    ///
    /// # Errors
    /// - [`Error::Validation`] if `name` is empty
    /// - [`Error::NotFound`] if no active record named `name` was loaded
    /// - [`Error::Conversion`] if the stored value does not convert to `T`
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.read(name, |_, value| value)
    }

    /// Like [`get`](Self::get), but also returns the record the value was converted from.
    ///
    /// Both come from the same snapshot, so a concurrent reload cannot pair a value with
    /// another version of its record.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub fn get_with_record<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<(ConfigurationRecord, T)> {
        self.read(name, |record, value| (record.clone(), value))
    }

    fn read<T, R>(&self, name: &str, f: impl FnOnce(&ConfigurationRecord, T) -> R) -> Result<R>
    where
        T: DeserializeOwned,
    {
        if name.is_empty() {
            return Err(Error::Validation {
                message: "Key cannot be empty".to_string(),
            });
        }

        let snapshot = self.snapshot.load();
        match snapshot.get(name) {
            Some(record) if record.is_active => {
                let value = convert(&record.value, &record.value_type)?;
                Ok(f(record, value))
            }
            _ => {
                warn!(
                    application = %self.application_name,
                    "Configuration key '{}' not found", name
                );
                Err(Error::NotFound {
                    name: name.to_string(),
                })
            }
        }
    }

    /// The snapshot readers currently see.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// All cached records, ordered by name.
    #[must_use]
    pub fn records(&self) -> Vec<ConfigurationRecord> {
        let mut records: Vec<_> = self.snapshot.load().iter().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// When the current snapshot was fetched.
    #[must_use]
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.load().loaded_at()
    }
}
