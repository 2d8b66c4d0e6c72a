//! Shared test utilities.
//!
//! This module provides helpers for setting up an in-memory store, inserting records with
//! sensible defaults, and an instrumented store wrapper that can simulate outages and slow
//! queries while counting what reached the backing store.

use crate::{
    errors::{Error, Result},
    models::ConfigurationRecord,
    store::{ConfigurationStore, RecordFilter, SeaOrmStore},
};
use async_trait::async_trait;
use sea_orm::DbErr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` store with the configuration table initialized.
pub async fn setup_test_store() -> Result<SeaOrmStore> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(SeaOrmStore::new(db))
}

/// Inserts an active record directly through the store, bypassing validation.
pub async fn insert_test_record(
    store: &dyn ConfigurationStore,
    name: &str,
    application_name: &str,
    value_type: &str,
    value: &str,
) -> Result<ConfigurationRecord> {
    store
        .insert_one(ConfigurationRecord::new(
            name,
            application_name,
            value_type,
            value,
        ))
        .await
}

/// Store wrapper that can be taken offline, slowed down, and counts traffic.
pub struct TestStore {
    inner: SeaOrmStore,
    offline: AtomicBool,
    find_delay: Duration,
    finds: AtomicUsize,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TestStore {
    pub fn new(inner: SeaOrmStore) -> Self {
        Self::with_find_delay(inner, Duration::ZERO)
    }

    pub fn with_find_delay(inner: SeaOrmStore, find_delay: Duration) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            find_delay,
            finds: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn setup() -> Result<Self> {
        Ok(Self::new(setup_test_store().await?))
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Highest number of `find` calls that were running at the same time.
    pub fn max_concurrent_finds(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Database(DbErr::Custom("store offline".to_string())));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigurationStore for TestStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<ConfigurationRecord>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.find_delay.is_zero() {
            tokio::time::sleep(self.find_delay).await;
        }
        let result = match self.check_online() {
            Ok(()) => self.inner.find(filter).await,
            Err(e) => Err(e),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn insert_one(&self, record: ConfigurationRecord) -> Result<ConfigurationRecord> {
        self.check_online()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_one(record).await
    }

    async fn replace_one(&self, id: i64, record: ConfigurationRecord) -> Result<bool> {
        self.check_online()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_one(id, record).await
    }
}
