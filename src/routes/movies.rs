use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::AppResult, middleware::RequestId, models::TmdbMovieDetails, routes::AppState,
};

/// Handler for a movie detail page
pub async fn details(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<u64>,
) -> AppResult<Json<TmdbMovieDetails>> {
    let details = state.recommendations.movie_details(id).await?;

    tracing::info!(
        request_id = %request_id,
        movie_id = id,
        "Movie details served"
    );

    Ok(Json(details))
}
