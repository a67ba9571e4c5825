use std::sync::Arc;

use anyhow::Context;
use storage::{Database, MemoryStore, StatsStore};
use web::config::{Config, MEMORY_STORE_URL};

async fn connect_store(config: &Config) -> anyhow::Result<Option<Arc<dyn StatsStore>>> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL is not set; statistics endpoints will report a missing store");
        return Ok(None);
    };

    if database_url == MEMORY_STORE_URL {
        tracing::info!("Using the in-memory store; data is lost on restart");
        let store: Arc<dyn StatsStore> = Arc::new(MemoryStore::new());
        return Ok(Some(store));
    }

    tracing::info!(
        "Connecting to database at: {}",
        database_url.split('@').next_back().unwrap_or("unknown")
    );
    let db = Database::new(database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    if config.run_migrations {
        tracing::info!("Running database migrations");
        db.run_migrations()
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations completed successfully");
    }

    let store: Arc<dyn StatsStore> = Arc::new(db);
    Ok(Some(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Pitwall statistics API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    let store = connect_store(&config).await?;
    let state = web::AppState::new(store, &config);
    if state.streamer_keys.is_empty() {
        tracing::warn!("STREAMER_KEYS is empty; competition submissions will be rejected");
    }

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", bind_address);

    axum::serve(listener, web::app(state))
        .await
        .context("Server error")?;

    Ok(())
}
