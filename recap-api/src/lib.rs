//! recap-api library - usage-gated summary service
//!
//! Gates how many summaries a visitor may create per plan tier and
//! migrates anonymously-created summaries to durable accounts.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod cache;
pub mod claim;
pub mod guard;
pub mod identity;
pub mod ledger;
pub mod owners;
pub mod quota;
pub mod store;
pub mod summarizer;
pub mod video;

use cache::ReadThroughCache;
use claim::ClaimCoordinator;
use guard::UsageGuard;
use summarizer::Summarizer;

/// Application state shared across HTTP handlers
///
/// Cache and ledger access are injected here rather than held in
/// process-wide singletons; all authoritative state lives in the shared
/// database, so multiple instances are safe.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub guard: Arc<UsageGuard>,
    pub claims: Arc<ClaimCoordinator>,
}

impl AppState {
    /// Create application state
    ///
    /// cache_ttl_secs = 0 disables the usage cache (correctness is
    /// unaffected, only latency).
    pub fn new(
        db: SqlitePool,
        cache_ttl_secs: u64,
        lock_max_wait_ms: u64,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let cache = Arc::new(ReadThroughCache::new());

        let guard = Arc::new(UsageGuard::new(
            db.clone(),
            Arc::clone(&cache),
            Duration::from_secs(cache_ttl_secs),
            lock_max_wait_ms,
            summarizer,
        ));
        let claims = Arc::new(ClaimCoordinator::new(db.clone(), cache));

        Self { db, guard, claims }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(api::handlers::health))
        .route("/summaries", post(api::handlers::create_summary))
        .route(
            "/summaries/anonymous",
            post(api::handlers::create_anonymous_summary),
        )
        .route("/summaries/:id/claim", post(api::handlers::claim_summary))
        .route("/claims/auto", post(api::handlers::auto_claim))
        .route("/usage", get(api::handlers::get_usage))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
