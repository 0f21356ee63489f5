use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::tokens::JwtKeys;
use crate::business_registry::BusinessRegistryClient;
use crate::config::Config;
use crate::storage::ImageStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable image store. S3/MinIO in production, in-memory in tests.
    pub images: Arc<dyn ImageStore>,
    pub registry: BusinessRegistryClient,
    pub jwt: JwtKeys,
    pub config: Config,
}

#[cfg(test)]
impl AppState {
    /// State for router tests. The pool connects lazily and is never dialled
    /// by requests that are rejected before touching the database.
    pub fn for_tests() -> Self {
        use sqlx::postgres::PgPoolOptions;

        use crate::storage::memory::InMemoryImageStore;

        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let registry = BusinessRegistryClient::new(config.brn_api_url.clone(), None)
            .expect("http client");
        AppState {
            db,
            images: Arc::new(InMemoryImageStore::default()),
            registry,
            jwt: JwtKeys::from_config(&config),
            config,
        }
    }
}
