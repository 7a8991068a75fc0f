use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};
use crate::services::RecommendationService;

pub mod admin;
pub mod movies;
pub mod recommendations;
pub mod searches;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(recommendations: RecommendationService) -> Self {
        Self {
            recommendations: Arc::new(recommendations),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", get(recommendations::for_title))
        .route(
            "/users/:user_id/searches",
            post(searches::record_search).get(searches::list_searches),
        )
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::for_history),
        )
        .route("/searches/popular", get(searches::popular))
        .route("/movies/:id", get(movies::details))
        .route("/admin/reload", post(admin::reload))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let engine = state.recommendations.engine().get();
    let body = match &engine {
        Some(engine) => json!({
            "status": "healthy",
            "engine": "online",
            "fit_id": engine.bundle().fit_id(),
            "catalog_rows": engine.catalog().len(),
        }),
        None => json!({ "status": "degraded", "engine": "offline" }),
    };
    (StatusCode::OK, Json(body))
}
