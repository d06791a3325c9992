//! podcast-performance - relationship & feed directory for a federated actor
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - POST /send, NodeInfo, health, metrics                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Federation seam                              │
//! │  - Capability traits called by the substrate                │
//! │  - Delivery queue, mention rendering                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Actors, followers, posts, KV, pagination, publishing     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `federation`: Substrate-facing traits and delivery hand-off
//! - `data`: Database layer
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Request bodies larger than this are rejected before parsing
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    pub actors: Arc<service::ActorService>,
    pub followers: Arc<service::FollowerDirectory>,
    pub posts: Arc<service::ActivityStore>,
    pub publisher: Arc<service::Publisher>,

    /// Capability implementation handed to the federation substrate
    pub directory: federation::Directory,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build services over the connected database
    /// 2. Provision the configured local actor
    ///
    /// The database is connected (and later closed) by the caller.
    ///
    /// # Errors
    /// Returns error if the actor cannot be provisioned
    pub async fn new(
        config: config::AppConfig,
        db: Arc<data::Database>,
        delivery: Arc<dyn federation::ActivityDelivery>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let federation_config = &config.federation;
        let actors = Arc::new(service::ActorService::new(db.clone()));
        let followers = Arc::new(service::FollowerDirectory::new(
            db.clone(),
            federation_config.max_page_size,
        ));
        let posts = Arc::new(service::ActivityStore::new(
            db.clone(),
            federation_config.max_post_chars,
            federation_config.max_page_size,
        ));
        let kv = Arc::new(service::KvCache::new(db.clone()));
        let publisher = Arc::new(service::Publisher::new(
            actors.clone(),
            posts.clone(),
            delivery,
            config.server.base_url(),
        ));
        let directory = federation::Directory::new(
            actors.clone(),
            followers.clone(),
            posts.clone(),
            kv,
            federation_config.page_size,
        );

        Self::ensure_local_actor(&actors, &config.actor).await?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            actors,
            followers,
            posts,
            publisher,
            directory,
        })
    }

    /// Ensure the configured actor exists
    ///
    /// Key files are read as opaque text; keys are never generated here.
    async fn ensure_local_actor(
        actors: &service::ActorService,
        actor_config: &config::ActorConfig,
    ) -> Result<(), error::AppError> {
        let key_pair = match (&actor_config.private_key_path, &actor_config.public_key_path) {
            (Some(private_path), Some(public_path)) => Some(data::KeyPair {
                private_key: read_key_file(private_path).await?,
                public_key: read_key_file(public_path).await?,
            }),
            (None, None) => None,
            _ => {
                return Err(error::AppError::Config(
                    "actor.private_key_path and actor.public_key_path must be set together"
                        .to_string(),
                ));
            }
        };

        let (actor, created) = actors
            .provision(data::NewLocalActor {
                handle: actor_config.handle.clone(),
                actor_type: actor_config.actor_type,
                profile: data::ActorProfile {
                    display_name: actor_config.display_name.clone(),
                    summary: actor_config.summary.clone(),
                    ..Default::default()
                },
                key_pair,
            })
            .await?;

        if !created {
            tracing::info!(handle = %actor.handle, "Local actor exists");
        }

        Ok(())
    }
}

async fn read_key_file(path: &std::path::Path) -> Result<String, error::AppError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        error::AppError::Config(format!("failed to read key file {}: {e}", path.display()))
    })
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower::ServiceBuilder;
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::publish_router())
        .merge(api::nodeinfo_router())
        .layer(middleware)
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> axum::Json<api::HealthResponse> {
    axum::Json(api::HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
