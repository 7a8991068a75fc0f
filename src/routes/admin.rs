use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::{error::AppResult, middleware::RequestId, routes::AppState};

/// Reloads catalog and artifacts from disk and swaps them in atomically
pub async fn reload(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<Value>> {
    tracing::info!(request_id = %request_id, "Reloading artifact bundle");
    let fit_id = state.recommendations.reload().await?;
    Ok(Json(json!({ "status": "reloaded", "fit_id": fit_id })))
}
