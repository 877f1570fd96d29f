use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::background::analytics::snapshot_now;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/analytics
///
/// Dashboard aggregates computed from the collection as of now.
pub async fn get_analytics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = snapshot_now(&state.tickets, &state.catalogs, state.config.andon.utc_offset);
    Ok(Json(DataResponse { data: snapshot }))
}
