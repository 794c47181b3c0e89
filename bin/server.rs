// EntitySense - Web Server
// REST API with Axum: watchlist enrollment + payment screening

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use entity_sense::api::{router, AppState};
use entity_sense::{
    EmbeddingProvider, EnrollmentService, EntitySenseConfig, OllamaEmbeddingProvider,
    ScreeningService, SqliteWatchlistStore, WatchlistStore,
};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entity_sense=info,tower_http=info".into()),
        )
        .init();

    // Optional config file as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EntitySenseConfig::load(config_path.as_deref())?;

    // The blocking HTTP client must be built outside the async runtime
    let ollama = OllamaEmbeddingProvider::new(&config).context("Failed to build HTTP client")?;
    let provider_url = ollama.url().to_string();
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(ollama);
    let store: Arc<dyn WatchlistStore> = Arc::new(
        SqliteWatchlistStore::open(&config.database_path)
            .with_context(|| format!("Failed to open database {:?}", config.database_path))?,
    );

    info!(
        database = ?config.database_path,
        entries = store.count()?,
        provider = %provider_url,
        threshold = config.distance_threshold,
        "Watchlist opened"
    );

    let state = AppState {
        enrollment: Arc::new(EnrollmentService::new(provider.clone(), store.clone(), &config)),
        screening: Arc::new(ScreeningService::new(provider, store, &config)),
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

        info!(addr = %config.bind_addr, "🚀 Server running");
        info!("   POST /api/create-watch-list-entity");
        info!("   POST /api/validate-payment");

        axum::serve(listener, router(state))
            .await
            .context("Server stopped unexpectedly")
    })
}
