//! Station audio: the unlock gesture and status.

use andon_audio::AudioStatus;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationAudio {
    /// Announcements are active on this station.
    pub enabled: bool,
    pub announcing: bool,
    #[serde(flatten)]
    pub audio: AudioStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    /// `false` when audio was already enabled.
    pub newly_enabled: bool,
    #[serde(flatten)]
    pub status: StationAudio,
}

fn station_audio(state: &AppState) -> StationAudio {
    StationAudio {
        enabled: state.coordinator.is_enabled(),
        announcing: state.coordinator.is_announcing(),
        audio: state.coordinator.scheduler().status(),
    }
}

/// POST /api/v1/audio/unlock
///
/// The operator's "enable audio" gesture. Tickets already pending are not
/// announced; only tickets arriving afterwards are.
pub async fn unlock_audio(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let newly_enabled = state.coordinator.enable(&state.tickets.snapshot());
    if newly_enabled {
        tracing::info!("Station audio enabled");
    }

    Ok(Json(DataResponse {
        data: UnlockResponse {
            newly_enabled,
            status: station_audio(&state),
        },
    }))
}

/// GET /api/v1/audio/status
pub async fn audio_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: station_audio(&state),
    }))
}
