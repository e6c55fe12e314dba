//! Gearloan Server - equipment lending with QR-scan borrowing

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gearloan_server::{
    api,
    config::{AppConfig, ScanStoreBackend, StorageBackend},
    repository::{memory::MemoryRepository, LendingStore, Repository},
    services::{
        redis::RedisScanStatusStore,
        scan_status::{MemoryScanStatusStore, ScanStatusStore},
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gearloan_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Gearloan Server v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn LendingStore> = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations completed");

            Arc::new(Repository::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let scan_status: Arc<dyn ScanStatusStore> = match config.scan.store {
        ScanStoreBackend::Memory => MemoryScanStatusStore::with_sweeper(config.scan.sweep_interval()),
        ScanStoreBackend::Redis => {
            let redis = RedisScanStatusStore::new(&config.redis.url).await?;
            tracing::info!("Connected to Redis");
            Arc::new(redis)
        }
    };

    let services = Services::new(store, scan_status, &config)?;

    if config.seed.demo_data {
        services.catalog.seed_demo_data().await?;
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
