use axum::routing::{get, post};
use axum::Router;

use crate::handlers::audio;
use crate::state::AppState;

/// Station audio routes mounted at `/audio`.
///
/// ```text
/// POST   /unlock            -> unlock_audio
/// GET    /status            -> audio_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/unlock", post(audio::unlock_audio))
        .route("/status", get(audio::audio_status))
}
