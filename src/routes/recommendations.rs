use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::MovieCard,
    routes::AppState,
};

/// Upper bound on `top_n` accepted from clients
const MAX_TOP_N: usize = 100;

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub title: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TopNQuery {
    pub top_n: Option<usize>,
}

fn check_top_n(top_n: Option<usize>) -> AppResult<Option<usize>> {
    match top_n {
        Some(n) if n > MAX_TOP_N => Err(AppError::InvalidInput(format!(
            "top_n must be at most {}",
            MAX_TOP_N
        ))),
        other => Ok(other),
    }
}

/// Handler for single-title recommendations
pub async fn for_title(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<TitleQuery>,
) -> AppResult<Json<Vec<MovieCard>>> {
    let top_n = check_top_n(params.top_n)?;
    if params.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title cannot be empty".to_string()));
    }

    let cards = state
        .recommendations
        .recommend_for_query(params.title.trim(), top_n)
        .await?;

    tracing::info!(
        request_id = %request_id,
        title = %params.title,
        results = cards.len(),
        "Title recommendations served"
    );

    Ok(Json(cards))
}

/// Handler for history-based recommendations
pub async fn for_history(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Query(params): Query<TopNQuery>,
) -> AppResult<Json<Vec<MovieCard>>> {
    let top_n = check_top_n(params.top_n)?;
    let cards = state
        .recommendations
        .recommend_for_history(&user_id, top_n)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        results = cards.len(),
        "History recommendations served"
    );

    Ok(Json(cards))
}
