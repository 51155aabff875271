pub mod api;
pub mod client;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;
pub mod wallet;

use crate::api::middleware::rate_limit::RateLimiter;
use crate::config::AppConfig;
use crate::services::pinning::PinningService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::pin::pin_file,
        api::handlers::uploads::create_upload,
        api::handlers::uploads::get_by_cid,
        api::handlers::uploads::list_by_wallet,
        api::handlers::uploads::list_uploads,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::pin::PinData,
            api::handlers::pin::PinResponse,
            api::handlers::uploads::CreateUploadRequest,
            api::handlers::uploads::CreateUploadResponse,
            api::handlers::uploads::UploadResponse,
            api::handlers::uploads::ListUploadsResponse,
            api::handlers::uploads::Pagination,
            entities::upload_records::Model,
        )
    ),
    tags(
        (name = "pinning", description = "IPFS pinning gateway"),
        (name = "uploads", description = "Upload record storage and lookup"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub pinning: Arc<dyn PinningService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: AppConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        pinning: Arc<dyn PinningService>,
        config: AppConfig,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window,
            config.rate_limit_max_requests,
        ));
        Self {
            db,
            pinning,
            rate_limiter,
            config,
            started_at: Instant::now(),
        }
    }
}

fn build_cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/upload/ipfs", post(api::handlers::pin::pin_file))
        .route(
            "/api/upload",
            post(api::handlers::uploads::create_upload).get(api::handlers::uploads::list_uploads),
        )
        .route(
            "/api/upload/cid/:cid",
            get(api::handlers::uploads::get_by_cid),
        )
        .route(
            "/api/upload/wallet/:address",
            get(api::handlers::uploads::list_by_wallet),
        )
        .fallback(api::handlers::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            api::middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(build_cors(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // multipart framing overhead
        ))
        .with_state(state)
}
