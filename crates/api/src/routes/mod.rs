pub mod analytics;
pub mod audio;
pub mod catalogs;
pub mod health;
pub mod tickets;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                  WebSocket (events + analytics)
///
/// /tickets                             history (?q=), create
/// /tickets/{id}                        get
/// /tickets/{id}/acknowledge            PENDING -> ACKNOWLEDGED (POST)
/// /tickets/{id}/resolve                ACKNOWLEDGED -> RESOLVED (POST)
/// /tickets/{id}/announce               repeat announcement (POST)
///
/// /catalogs/{kind}                     list, add
/// /catalogs/{kind}/{value}             remove
///
/// /analytics                           dashboard snapshot
///
/// /audio/unlock                        enable station audio (POST)
/// /audio/status                        audio status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_handler))
        // Tickets
        .nest("/tickets", tickets::router())
        // Catalog lists
        .nest("/catalogs", catalogs::router())
        // Dashboard
        .nest("/analytics", analytics::router())
        // Station audio
        .nest("/audio", audio::router())
}
