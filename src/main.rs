use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lynks::clicks::{ClickRecorder, RecorderSettings};
use lynks::config::{Config, DatabaseBackend};
use lynks::reconcile;
use lynks::store::{CachedStore, LinkStore, MemoryStore, PostgresStore, SqliteStore};
use lynks::visit;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let store: Arc<dyn LinkStore> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite store: {}", config.database.url);
            Arc::new(SqliteStore::new(&config.database.url, config.database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL store: {}", config.database.url);
            Arc::new(
                PostgresStore::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Memory => {
            info!("Using in-memory store (non-durable)");
            Arc::new(MemoryStore::new())
        }
    };

    info!("Initializing database...");
    store.init().await?;
    info!("Database initialized successfully");

    let store: Arc<dyn LinkStore> = if config.cache.max_entries > 0 {
        info!(
            "Read cache enabled ({} entries, {}s TTL)",
            config.cache.max_entries, config.cache.ttl_secs
        );
        Arc::new(CachedStore::new(
            store,
            config.cache.max_entries,
            config.cache.ttl_secs,
        ))
    } else {
        store
    };

    let recorder = Arc::new(ClickRecorder::new(
        Arc::clone(&store),
        RecorderSettings {
            max_attempts: config.recorder.max_attempts,
            retry_backoff: Duration::from_millis(config.recorder.retry_backoff_ms),
        },
    ));

    if config.reconcile.interval_secs > 0 {
        info!(
            "Periodic counter reconciliation every {}s",
            config.reconcile.interval_secs
        );
        let _reconcile_task = reconcile::spawn_periodic(
            Arc::clone(&store),
            Duration::from_secs(config.reconcile.interval_secs),
        );
    } else {
        info!("Periodic counter reconciliation disabled");
    }

    let router = visit::create_visit_router(Arc::clone(&store), recorder);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Visit server listening on http://{}", addr);
    info!("   - Redirects served at http://{}/visit/{{link_id}}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
