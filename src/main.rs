use config_reader::{
    ConfigCache, RefreshScheduler,
    api::{AppState, setup_router},
    config::{AppConfig, database, settings::SettingsTree},
    core::reconcile::{default_exclusions, reconcile},
    errors::{Error, Result},
    store::SeaOrmStore,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load the process configuration
    let app_config = AppConfig::load()
        .inspect_err(|e| error!("Failed to load application configuration: {}", e))?;
    info!(
        application = %app_config.application_name,
        "Loaded application configuration"
    );

    // 4. Initialize database
    let db = database::create_connection(&app_config.database_url).await?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Build the cache (performs the initial load) and start refreshing it
    let store = Arc::new(SeaOrmStore::new(db));
    let cache = Arc::new(
        ConfigCache::connect(
            store,
            app_config.application_name.as_str(),
            app_config.cache_options(),
        )
        .await?,
    );
    let scheduler =
        RefreshScheduler::new(Arc::clone(&cache), app_config.refresh_interval())?.start();

    // 6. Seed the store from the local settings file; failures are not fatal
    if app_config.settings_path.exists() {
        match SettingsTree::load(&app_config.settings_path) {
            Ok(tree) => {
                if let Err(e) = reconcile(&cache, &tree, &default_exclusions()).await {
                    error!("Settings reconciliation failed: {}", e);
                }
            }
            Err(e) => error!("Failed to load settings file: {}", e),
        }
    } else {
        warn!(
            "Settings file {} not found, skipping reconciliation",
            app_config.settings_path.display()
        );
    }

    // 7. Serve the HTTP API until Ctrl+C
    let listener = tokio::net::TcpListener::bind(&app_config.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.bind_address, e))?;
    info!("Listening on {}", app_config.bind_address);

    let served = axum::serve(listener, setup_router(AppState::new(cache)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 8. Stop background refresh before exiting
    scheduler.stop().await;
    info!("Shutdown complete");

    served.map_err(|e| Error::Server {
        message: e.to_string(),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
