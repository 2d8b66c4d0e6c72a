//! Database configuration module.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::Configuration;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema};
use tracing::{info, warn};

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://config_reader.sqlite?mode=rwc";

/// Partial unique index allowing one active record per name and application.
pub const ACTIVE_NAME_INDEX: &str = "idx_configurations_active_name";

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    info!("Connected to database");
    Ok(db)
}

/// Creates the configuration table and its active-name index if they do not exist yet.
///
/// The index makes `(name, application_name)` unique among active rows at the database level,
/// so concurrent writers cannot both pass the duplicate check.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut configuration_table = schema.create_table_from_entity(Configuration);
    configuration_table.if_not_exists();

    db.execute(builder.build(&configuration_table)).await?;

    match builder {
        DatabaseBackend::Sqlite | DatabaseBackend::Postgres => {
            db.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {ACTIVE_NAME_INDEX} \
                 ON configurations (name, application_name) WHERE is_active"
            ))
            .await?;
        }
        // MySQL has no partial indexes
        _ => {
            warn!("Active-name uniqueness is only checked by the service layer on MySQL");
        }
    }

    Ok(())
}
