use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{PopularSearch, SearchRecord},
    routes::AppState,
    services::recommendations::SearchOutcome,
};

const DEFAULT_POPULAR_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// Records a search and returns recommendations for it
pub async fn record_search(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<SearchRequest>,
) -> AppResult<(StatusCode, Json<SearchOutcome>)> {
    let outcome = state
        .recommendations
        .search(&user_id, &request.query)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Lists a user's searches, most recent first
pub async fn list_searches(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<SearchRecord>> {
    Json(state.recommendations.searches(&user_id))
}

/// Most searched titles across all users
pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> Json<Vec<PopularSearch>> {
    let limit = params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
    Json(state.recommendations.popular_searches(limit))
}
