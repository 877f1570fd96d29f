use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::catalogs;
use crate::state::AppState;

/// Catalog routes mounted at `/catalogs`.
///
/// `kind` is one of `models`, `lines`, `reasons`, `tech-types`.
///
/// ```text
/// GET    /{kind}            -> get_catalog
/// POST   /{kind}            -> add_catalog_item
/// DELETE /{kind}/{value}    -> remove_catalog_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{kind}",
            get(catalogs::get_catalog).post(catalogs::add_catalog_item),
        )
        .route("/{kind}/{value}", delete(catalogs::remove_catalog_item))
}
