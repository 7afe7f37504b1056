// src/main.rs

use std::sync::Arc;

use rankpred::config::Config;
use rankpred::error::AppError;
use rankpred::repository::{MemoryRepository, PgRepository, ResultRepository};
use rankpred::routes;
use rankpred::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "rankpred.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let repo: Arc<dyn ResultRepository> = match &config.database_url {
        Some(url) => Arc::new(PgRepository::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, results are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(repo, config)?;

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Internal(format!("failed to bind {}: {}", bind_addr, e)))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("server error: {}", e)))
}
