//! Configuration entity - Represents one named, typed configuration value.
//!
//! Each row belongs to a single application. Rows are never physically removed by the
//! service layer; `is_active` acts as the soft delete flag.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "configurations")]
pub struct Model {
    /// Unique identifier assigned by the database
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Key of the value within its application (e.g., `"SiteName"`, `"Features:Search"`)
    pub name: String,
    /// Application that reads this value
    pub application_name: String,
    /// Declared type tag (e.g., `"string"`, `"int"`, `"bool"`)
    pub value_type: String,
    /// Value serialized as text
    pub value: String,
    /// Soft delete flag - inactive rows are kept but never loaded into a cache
    pub is_active: bool,
    /// When the row was first written
    pub created_time: DateTimeUtc,
}

/// Configuration rows have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
