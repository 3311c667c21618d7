//! Axum API server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::content::ContentGenerator;
use crate::health::{HealthRegistry, UsageMetrics};

use super::routes;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub generator: ContentGenerator,
    /// Root of the static site; images are read from `<public_dir>/images`.
    pub public_dir: PathBuf,
    pub health: Arc<HealthRegistry>,
    pub metrics: Arc<UsageMetrics>,
}

impl AppState {
    pub fn new(
        generator: ContentGenerator,
        public_dir: PathBuf,
        health: Arc<HealthRegistry>,
        metrics: Arc<UsageMetrics>,
    ) -> Self {
        Self {
            generator,
            public_dir,
            health,
            metrics,
        }
    }

    pub fn images_root(&self) -> PathBuf {
        self.public_dir.join("images")
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let shared_state = Arc::new(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([HeaderName::from_static("content-type")]);

    let api = Router::new()
        // Content
        .route(
            "/api/generate-content",
            get(routes::content::get_content).post(routes::content::generate_content),
        )
        .route(
            "/api/lesson",
            axum::routing::post(routes::content::generate_lesson),
        )
        .route("/api/age-groups", get(routes::age_groups::list_age_groups))
        // Images
        .route("/api/random-image", get(routes::images::random_image))
        .route(
            "/api/placeholder-image",
            get(routes::images::placeholder_image),
        )
        // Subscription (mocked)
        .route(
            "/api/subscribe",
            get(routes::subscribe::check_subscription).post(routes::subscribe::create_subscription),
        )
        // Health
        .route("/api/health", get(routes::health::get_health))
        // Body size limit: 1 MiB.
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    if let Some(dir) = static_dir {
        api.fallback_service(tower_http::services::ServeDir::new(dir))
    } else {
        api
    }
}

/// The directory to serve as static assets, if it exists.
pub fn static_dir(public_dir: &Path) -> Option<PathBuf> {
    public_dir.is_dir().then(|| public_dir.to_path_buf())
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let static_dir = static_dir(&state.public_dir);
    if static_dir.is_none() {
        tracing::warn!(
            path = %state.public_dir.display(),
            "Public directory not found; static assets disabled"
        );
    }
    let metrics = state.metrics.clone();

    let app = build_router(state, static_dir);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Better Bible server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    metrics.emit_usage("shutdown");
    Ok(())
}
