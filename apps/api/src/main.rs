mod admin;
mod applications;
mod auth;
mod business_registry;
mod company_info;
mod company_users;
mod config;
mod db;
mod errors;
mod extract;
mod favorites;
mod job_postings;
mod models;
mod resumes;
mod routes;
mod state;
mod storage;
mod users;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::admin::bootstrap_superuser;
use crate::auth::tokens::JwtKeys;
use crate::business_registry::BusinessRegistryClient;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, S3ImageStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting job board API v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    bootstrap_superuser(&db, &config).await?;

    let s3 = build_s3_client(&config).await;
    let images = S3ImageStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
    );
    info!("Image store ready (bucket: {})", config.s3_bucket);

    let registry =
        BusinessRegistryClient::new(config.brn_api_url.clone(), config.brn_service_key.clone())?;
    if config.brn_service_key.is_none() {
        info!("BRN_SERVICE_KEY not set, business number checks are disabled");
    }

    let state = AppState {
        db,
        images: Arc::new(images),
        registry,
        jwt: JwtKeys::from_config(&config),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
