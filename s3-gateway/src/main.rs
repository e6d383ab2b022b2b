use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use s3_gateway::{
    config::{BackendKind, Config},
    create_router,
    storage::{BackendFactory, MemoryFactory, S3Factory},
    AppState,
};
use shared::observability::{init_logging, LogConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_logging(LogConfig::from_env("s3-gateway")?)?;

    info!("Starting S3 Gateway...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(storage = ?config.storage, "Configuration loaded successfully");

    let factory: Arc<dyn BackendFactory> = match config.storage.backend {
        BackendKind::S3 => Arc::new(S3Factory),
        BackendKind::Memory => {
            warn!("Using in-memory storage backend, objects are lost on restart");
            Arc::new(MemoryFactory::default())
        }
    };

    let addr = config.server.bind_address();
    let app = create_router(AppState::new(config, factory));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("S3 Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("S3 Gateway stopped");
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server just runs until killed
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
