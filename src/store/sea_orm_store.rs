//! `SeaORM`-backed implementation of [`ConfigurationStore`].
//!
//! Filters are pushed down as a single `WHERE` conjunction. The name match compares
//! `LOWER(name)` against an ASCII-lowercased, escaped `LIKE` pattern. On SQLite both fold
//! ASCII letters only, which is exactly what [`RecordFilter::matches`] does.

use super::{ConfigurationStore, RecordFilter};
use crate::{
    entities::{Configuration, configuration},
    errors::{Error, Result},
    models::ConfigurationRecord,
};
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{Condition, QueryOrder, Set, SqlErr, prelude::*};

/// Store client over a `SeaORM` database connection.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_condition(filter: &RecordFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(id) = filter.id {
        condition = condition.add(configuration::Column::Id.eq(id));
    }
    if let Some(name) = &filter.name {
        condition = condition.add(configuration::Column::Name.eq(name.as_str()));
    }
    if let Some(app) = &filter.application_name {
        condition = condition.add(configuration::Column::ApplicationName.eq(app.as_str()));
    }
    if let Some(active) = filter.is_active {
        condition = condition.add(configuration::Column::IsActive.eq(active));
    }
    if let Some(fragment) = &filter.name_contains {
        let pattern = format!("%{}%", escape_like(&fragment.to_ascii_lowercase()));
        condition = condition.add(
            Expr::expr(Func::lower(Expr::col(configuration::Column::Name)))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }
    condition
}

fn to_active_model(record: ConfigurationRecord) -> configuration::ActiveModel {
    configuration::ActiveModel {
        name: Set(record.name),
        application_name: Set(record.application_name),
        value_type: Set(record.value_type),
        value: Set(record.value),
        is_active: Set(record.is_active),
        created_time: Set(record.created_time),
        ..Default::default()
    }
}

/// Maps a unique-index violation on a write to [`Error::DuplicateName`].
fn write_error(err: DbErr, name: String, application_name: String) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateName {
            name,
            application_name,
        },
        _ => err.into(),
    }
}

#[async_trait]
impl ConfigurationStore for SeaOrmStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<ConfigurationRecord>> {
        let models = Configuration::find()
            .filter(to_condition(filter))
            .order_by_asc(configuration::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(ConfigurationRecord::from).collect())
    }

    async fn insert_one(&self, record: ConfigurationRecord) -> Result<ConfigurationRecord> {
        let (name, application_name) = (record.name.clone(), record.application_name.clone());
        let model = to_active_model(record)
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, name, application_name))?;
        Ok(model.into())
    }

    async fn replace_one(&self, id: i64, record: ConfigurationRecord) -> Result<bool> {
        let (name, application_name) = (record.name.clone(), record.application_name.clone());
        let result = Configuration::update_many()
            .set(to_active_model(record))
            .filter(configuration::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| write_error(e, name, application_name))?;
        Ok(result.rows_affected > 0)
    }
}
