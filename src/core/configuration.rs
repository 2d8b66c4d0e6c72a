//! Configuration record business logic - administrative CRUD over the store.
//!
//! These functions back the HTTP API. They validate input, enforce that a name is unique
//! among an application's active records, and implement deletion as a soft delete so that
//! history stays in the store. Listings come back newest first.

use crate::{
    errors::{Error, Result},
    models::ConfigurationRecord,
    store::{ConfigurationStore, RecordFilter},
};
use chrono::Utc;
use tracing::{info, instrument};

fn newest_first(mut records: Vec<ConfigurationRecord>) -> Vec<ConfigurationRecord> {
    records.sort_by(|a, b| b.created_time.cmp(&a.created_time).then(b.id.cmp(&a.id)));
    records
}

/// Retrieves all records, optionally limited to one application, newest first.
///
/// Inactive records are included; administrators need to see soft-deleted entries.
///
/// # Errors
/// Returns an error if the store query fails.
pub async fn list_configurations(
    store: &dyn ConfigurationStore,
    application_name: Option<&str>,
) -> Result<Vec<ConfigurationRecord>> {
    let mut filter = RecordFilter::new();
    if let Some(app) = application_name {
        filter = filter.application(app);
    }
    store.find(&filter).await.map(newest_first)
}

/// Retrieves records whose name contains `fragment`, ignoring case, newest first.
///
/// # Errors
/// Returns an error if the store query fails.
pub async fn search_configurations_by_name(
    store: &dyn ConfigurationStore,
    fragment: &str,
) -> Result<Vec<ConfigurationRecord>> {
    store
        .find(&RecordFilter::new().name_contains(fragment))
        .await
        .map(newest_first)
}

/// Retrieves a record by its id, active or not.
///
/// # Errors
/// Returns an error if the store query fails.
pub async fn get_configuration_by_id(
    store: &dyn ConfigurationStore,
    id: i64,
) -> Result<Option<ConfigurationRecord>> {
    Ok(store
        .find(&RecordFilter::new().id(id))
        .await?
        .into_iter()
        .next())
}

fn validate(record: &mut ConfigurationRecord) -> Result<()> {
    record.name = record.name.trim().to_string();
    record.application_name = record.application_name.trim().to_string();

    if record.name.is_empty() {
        return Err(Error::Validation {
            message: "Configuration name cannot be empty".to_string(),
        });
    }
    if record.application_name.is_empty() {
        return Err(Error::Validation {
            message: "Application name cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Fails with [`Error::DuplicateName`] if another active record of the same application
/// already uses `record.name`.
///
/// This only gives an early, friendly answer. Two writers can both pass it; the store's
/// unique index rejects the second write with the same error.
async fn ensure_unique(
    store: &dyn ConfigurationStore,
    record: &ConfigurationRecord,
    except_id: Option<i64>,
) -> Result<()> {
    let filter = RecordFilter::new()
        .name(record.name.as_str())
        .application(record.application_name.as_str())
        .active(true);
    let clash = store
        .find(&filter)
        .await?
        .into_iter()
        .any(|existing| except_id.is_none_or(|id| existing.id != Some(id)));

    if clash {
        return Err(Error::DuplicateName {
            name: record.name.clone(),
            application_name: record.application_name.clone(),
        });
    }
    Ok(())
}

/// Creates a new record after validating it.
///
/// The name and application are trimmed, any client-supplied id is discarded and the
/// creation time is stamped now.
///
/// # Errors
/// Returns an error if:
/// - The name or application name is empty or whitespace-only
/// - An active record with the same name already exists for the application
/// - The store insert fails
#[instrument(skip_all, fields(name = %record.name, application = %record.application_name))]
pub async fn create_configuration(
    store: &dyn ConfigurationStore,
    mut record: ConfigurationRecord,
) -> Result<ConfigurationRecord> {
    validate(&mut record)?;
    if record.is_active {
        ensure_unique(store, &record, None).await?;
    }

    record.id = None;
    record.created_time = Utc::now();
    let saved = store.insert_one(record).await?;
    info!(id = ?saved.id, "Created configuration");
    Ok(saved)
}

/// Replaces the record with `id`, keeping its id and creation time.
///
/// Returns `None` if no record has that id.
///
/// # Errors
/// Returns an error if:
/// - The name or application name is empty or whitespace-only
/// - Another active record of the application already uses the new name
/// - The store query or update fails
#[instrument(skip(store, record))]
pub async fn update_configuration(
    store: &dyn ConfigurationStore,
    id: i64,
    mut record: ConfigurationRecord,
) -> Result<Option<ConfigurationRecord>> {
    let Some(existing) = get_configuration_by_id(store, id).await? else {
        return Ok(None);
    };

    validate(&mut record)?;
    if record.is_active {
        ensure_unique(store, &record, Some(id)).await?;
    }

    record.id = Some(id);
    record.created_time = existing.created_time;
    if !store.replace_one(id, record.clone()).await? {
        return Ok(None);
    }
    info!("Updated configuration");
    Ok(Some(record))
}

/// Soft-deletes the record with `id` by marking it inactive.
///
/// Returns `false` if no record has that id. Deleting an already inactive record succeeds.
///
/// # Errors
/// Returns an error if the store query or update fails.
#[instrument(skip(store))]
pub async fn delete_configuration(store: &dyn ConfigurationStore, id: i64) -> Result<bool> {
    let Some(mut record) = get_configuration_by_id(store, id).await? else {
        return Ok(false);
    };

    record.is_active = false;
    let deleted = store.replace_one(id, record).await?;
    if deleted {
        info!("Deleted configuration");
    }
    Ok(deleted)
}
