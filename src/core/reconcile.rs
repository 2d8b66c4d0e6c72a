//! Settings reconciliation - seeds the store with the application's local defaults.
//!
//! At startup the local settings tree is flattened into colon-joined names, each value's type
//! is guessed, and every candidate is merged into the store: missing names are inserted,
//! changed ones updated, identical ones left alone. The cache is reloaded once at the end so
//! readers see the merged state.

use crate::{
    cache::ConfigCache,
    config::settings::{SettingNode, SettingsTree},
    core::convert::{ValueType, infer_value_type},
    errors::Result,
    models::ConfigurationRecord,
    store::RecordFilter,
};
use std::collections::HashSet;
use tracing::{debug, error, info, instrument};

/// Top-level sections that describe the host process rather than application settings.
pub const DEFAULT_EXCLUDED_SECTIONS: [&str; 4] = [
    "Logging",
    "AllowedHosts",
    "ConnectionStrings",
    "ConfigurationReader",
];

/// Builds the default exclusion set.
#[must_use]
pub fn default_exclusions() -> HashSet<String> {
    DEFAULT_EXCLUDED_SECTIONS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// A flattened settings leaf waiting to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Colon-joined path, e.g. `Basket:Enabled`
    pub name: String,
    pub value: String,
    /// Inferred type tag
    pub value_type: String,
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl ReconcileReport {
    /// Number of writes issued against the store.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Flattens `tree` depth-first into candidates, skipping excluded top-level sections and
/// leaves with empty values.
#[must_use]
pub fn flatten(tree: &SettingsTree, excluded: &HashSet<String>) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (key, node) in tree.children() {
        if excluded.contains(key) {
            debug!("Skipping excluded settings section '{}'", key);
            continue;
        }
        collect(key.clone(), node, &mut candidates);
    }
    candidates
}

fn collect(path: String, node: &SettingNode, out: &mut Vec<Candidate>) {
    match node {
        SettingNode::Value(value) if value.is_empty() => {}
        SettingNode::Value(value) => out.push(Candidate {
            value_type: infer_value_type(value).as_str().to_string(),
            value: value.clone(),
            name: path,
        }),
        SettingNode::Section(section) => {
            for (key, child) in section.children() {
                collect(format!("{path}:{key}"), child, out);
            }
        }
    }
}

/// Merges the local settings tree into the store for the cache's application, then reloads
/// the cache.
///
/// Existing records are matched by name regardless of their active flag. A record whose value
/// and type already match (tags compared case-insensitively, so `Boolean` equals `bool`) is
/// not written, so a default that was soft-deleted stays deleted
/// until its local value changes.
///
/// # Errors
/// Returns the first store error. Candidates after the failing one are not processed and the
/// cache is not reloaded.
#[instrument(skip_all, fields(application = %cache.application_name()))]
pub async fn reconcile(
    cache: &ConfigCache,
    tree: &SettingsTree,
    excluded: &HashSet<String>,
) -> Result<ReconcileReport> {
    let application_name = cache.application_name();
    let store = cache.store();
    let mut report = ReconcileReport::default();

    for candidate in flatten(tree, excluded) {
        let filter = RecordFilter::new()
            .name(candidate.name.as_str())
            .application(application_name);
        let existing = store.find(&filter).await.inspect_err(|e| {
            error!("Failed to look up configuration '{}': {}", candidate.name, e);
        })?;

        // Prefer the live record if several share the name
        let current = existing
            .iter()
            .find(|r| r.is_active)
            .or_else(|| existing.first());

        match current {
            None => {
                let record = ConfigurationRecord::new(
                    candidate.name.as_str(),
                    application_name,
                    candidate.value_type.as_str(),
                    candidate.value.as_str(),
                );
                store.insert_one(record).await.inspect_err(|e| {
                    error!("Failed to insert configuration '{}': {}", candidate.name, e);
                })?;
                debug!("Inserted configuration '{}'", candidate.name);
                report.inserted += 1;
            }
            Some(record)
                if record.value == candidate.value
                    && ValueType::from_tag(&record.value_type)
                        == ValueType::from_tag(&candidate.value_type) =>
            {
                report.unchanged += 1;
            }
            Some(record) => {
                let Some(id) = record.id else {
                    report.unchanged += 1;
                    continue;
                };
                let mut updated = record.clone();
                updated.value = candidate.value;
                updated.value_type = candidate.value_type;
                updated.is_active = true;
                store.replace_one(id, updated).await.inspect_err(|e| {
                    error!("Failed to update configuration '{}': {}", record.name, e);
                })?;
                debug!("Updated configuration '{}'", record.name);
                report.updated += 1;
            }
        }
    }

    info!(
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        "Settings reconciled"
    );
    cache.reload().await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::cache::CacheOptions;
    use crate::errors::Error;
    use crate::store::ConfigurationStore;
    use crate::test_utils::*;
    use std::sync::Arc;

    fn sample_tree() -> SettingsTree {
        SettingsTree::new()
            .with_value("SiteName", "soty.io")
            .with_value("MaxItemCount", "50")
            .with_section(
                "Basket",
                SettingsTree::new()
                    .with_value("Enabled", "true")
                    .with_value("Ratio", "0.75")
                    .with_value("Empty", ""),
            )
            .with_section("Logging", SettingsTree::new().with_value("Level", "Debug"))
    }

    async fn setup_cache(store: Arc<TestStore>) -> Result<ConfigCache> {
        ConfigCache::connect(store, "SERVICE-A", CacheOptions::default()).await
    }

    #[test]
    fn test_flatten_joins_paths_and_infers_types() {
        let candidates = flatten(&sample_tree(), &default_exclusions());
        let summary: Vec<_> = candidates
            .iter()
            .map(|c| (c.name.as_str(), c.value_type.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("SiteName", "string"),
                ("MaxItemCount", "int"),
                ("Basket:Enabled", "bool"),
                ("Basket:Ratio", "double"),
            ]
        );
    }

    #[test]
    fn test_exclusion_applies_only_at_top_level() {
        let tree = SettingsTree::new().with_section(
            "Features",
            SettingsTree::new().with_section(
                "Logging",
                SettingsTree::new().with_value("Verbose", "false"),
            ),
        );
        let candidates = flatten(&tree, &default_exclusions());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Features:Logging:Verbose");
    }

    #[test]
    fn test_array_settings_flatten_with_indices() {
        let tree = SettingsTree::from_toml_str(r#"Hosts = ["a.local", "b.local"]"#).unwrap();
        let names: Vec<_> = flatten(&tree, &HashSet::new())
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Hosts:0", "Hosts:1"]);
    }

    #[tokio::test]
    async fn test_reconcile_inserts_updates_and_skips() -> Result<()> {
        init_test_tracing();
        let store = Arc::new(TestStore::setup().await?);
        insert_test_record(store.as_ref(), "SiteName", "SERVICE-A", "string", "soty.io").await?;
        insert_test_record(store.as_ref(), "MaxItemCount", "SERVICE-A", "int", "10").await?;
        // Same name under another application is not touched
        insert_test_record(store.as_ref(), "Basket:Enabled", "SERVICE-B", "bool", "false")
            .await?;
        let cache = setup_cache(Arc::clone(&store)).await?;

        let report = reconcile(&cache, &sample_tree(), &default_exclusions()).await?;

        assert_eq!(
            report,
            ReconcileReport {
                inserted: 2,
                updated: 1,
                unchanged: 1,
            }
        );
        assert_eq!(cache.get::<i32>("MaxItemCount")?, 50);
        assert!(cache.get::<bool>("Basket:Enabled")?);
        assert!((cache.get::<f64>("Basket:Ratio")? - 0.75).abs() < f64::EPSILON);
        assert!(matches!(
            cache.get::<String>("Logging:Level"),
            Err(Error::NotFound { name: _ })
        ));

        let other = store
            .find(&RecordFilter::new().application("SERVICE-B"))
            .await?;
        assert_eq!(other[0].value, "false");
        Ok(())
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() -> Result<()> {
        let store = Arc::new(TestStore::setup().await?);
        let cache = setup_cache(Arc::clone(&store)).await?;

        let first = reconcile(&cache, &sample_tree(), &default_exclusions()).await?;
        assert_eq!(first.inserted, 4);
        let writes_after_first = store.writes();

        let second = reconcile(&cache, &sample_tree(), &default_exclusions()).await?;
        assert_eq!(second.writes(), 0);
        assert_eq!(second.unchanged, 4);
        assert_eq!(store.writes(), writes_after_first);
        Ok(())
    }

    #[tokio::test]
    async fn test_equivalent_type_tags_are_not_rewritten() -> Result<()> {
        let store = Arc::new(TestStore::setup().await?);
        insert_test_record(store.as_ref(), "IsBasketEnabled", "SERVICE-A", "Boolean", "true")
            .await?;
        insert_test_record(store.as_ref(), "MaxItemCount", "SERVICE-A", "INTEGER", "50").await?;
        let cache = setup_cache(Arc::clone(&store)).await?;
        let writes_before = store.writes();

        let tree = SettingsTree::new()
            .with_value("IsBasketEnabled", "true")
            .with_value("MaxItemCount", "50");
        let report = reconcile(&cache, &tree, &default_exclusions()).await?;

        assert_eq!(report.unchanged, 2);
        assert_eq!(store.writes(), writes_before);
        let stored = store.find(&RecordFilter::new().name("MaxItemCount")).await?;
        assert_eq!(stored[0].value_type, "INTEGER");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_identity_and_reactivates() -> Result<()> {
        let store = Arc::new(TestStore::setup().await?);
        let mut saved =
            insert_test_record(store.as_ref(), "SiteName", "SERVICE-A", "string", "old.io")
                .await?;
        let id = saved.id.unwrap();
        saved.is_active = false;
        store.replace_one(id, saved).await?;
        let before = store.find(&RecordFilter::new().id(id)).await?;
        let cache = setup_cache(Arc::clone(&store)).await?;

        let tree = SettingsTree::new().with_value("SiteName", "soty.io");
        let report = reconcile(&cache, &tree, &default_exclusions()).await?;
        assert_eq!(report.updated, 1);

        let stored = store.find(&RecordFilter::new().id(id)).await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, "soty.io");
        assert!(stored[0].is_active);
        assert_eq!(stored[0].created_time, before[0].created_time);
        assert_eq!(cache.get::<String>("SiteName")?, "soty.io");
        Ok(())
    }

    #[tokio::test]
    async fn test_identical_soft_deleted_default_stays_deleted() -> Result<()> {
        let store = Arc::new(TestStore::setup().await?);
        let mut saved =
            insert_test_record(store.as_ref(), "SiteName", "SERVICE-A", "string", "soty.io")
                .await?;
        saved.is_active = false;
        store.replace_one(saved.id.unwrap(), saved).await?;
        let cache = setup_cache(Arc::clone(&store)).await?;
        let writes_before = store.writes();

        let tree = SettingsTree::new().with_value("SiteName", "soty.io");
        let report = reconcile(&cache, &tree, &default_exclusions()).await?;

        assert_eq!(report.unchanged, 1);
        assert_eq!(store.writes(), writes_before);
        assert!(cache.lookup("SiteName").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_aborts_remaining_candidates() -> Result<()> {
        let store = Arc::new(TestStore::setup().await?);
        let cache = setup_cache(Arc::clone(&store)).await?;
        store.set_offline(true);

        let result = reconcile(&cache, &sample_tree(), &default_exclusions()).await;
        assert!(matches!(result, Err(Error::Database(_))));

        store.set_offline(false);
        assert!(store.find(&RecordFilter::new()).await?.is_empty());
        Ok(())
    }
}
