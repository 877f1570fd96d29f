use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tickets;
use crate::state::AppState;

/// Ticket routes mounted at `/tickets`.
///
/// ```text
/// GET    /                  -> list_tickets (?q=)
/// POST   /                  -> create_ticket
/// GET    /{id}              -> get_ticket
/// POST   /{id}/acknowledge  -> acknowledge_ticket
/// POST   /{id}/resolve      -> resolve_ticket
/// POST   /{id}/announce     -> announce_ticket
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tickets::list_tickets).post(tickets::create_ticket))
        .route("/{id}", get(tickets::get_ticket))
        .route("/{id}/acknowledge", post(tickets::acknowledge_ticket))
        .route("/{id}/resolve", post(tickets::resolve_ticket))
        .route("/{id}/announce", post(tickets::announce_ticket))
}
