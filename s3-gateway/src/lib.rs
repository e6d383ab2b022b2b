//! S3 gateway: a small HTTP facade that stores multipart uploads in an
//! S3-compatible bucket and serves them back by key.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod storage;

use config::Config;
use storage::{BackendFactory, StorageClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageClient>,
    pub config: Arc<Config>,
}

impl AppState {
    /// The storage handle itself is only built on the first storage call.
    pub fn new(config: Config, factory: Arc<dyn BackendFactory>) -> Self {
        let storage = StorageClient::new(config.storage.clone(), factory);
        Self {
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/s3/create", post(handlers::objects::create_file))
        .route("/s3/replace", put(handlers::objects::replace_file))
        .route("/s3/read", get(handlers::objects::read_file))
        .route("/s3/delete", delete(handlers::objects::delete_file))
        .route("/s3/info", get(handlers::objects::storage_info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .layer(cors),
        )
        .with_state(state)
}
