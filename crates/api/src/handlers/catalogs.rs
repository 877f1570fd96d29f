//! Handlers for the quick-select catalog lists.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use andon_core::catalog::CatalogKind;
use andon_core::error::CoreError;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogItemRequest {
    #[serde(default)]
    pub value: String,
}

fn parse_kind(kind: &str) -> Result<CatalogKind, CoreError> {
    CatalogKind::parse(kind).ok_or_else(|| CoreError::NotFound {
        entity: "catalog",
        id: kind.to_string(),
    })
}

/// GET /api/v1/catalogs/{kind}
pub async fn get_catalog(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    Ok(Json(DataResponse {
        data: state.catalogs.list(kind),
    }))
}

/// POST /api/v1/catalogs/{kind}
///
/// Add a value. Trimmed; duplicates leave the list unchanged.
pub async fn add_catalog_item(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(input): Json<CatalogItemRequest>,
) -> AppResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    if input.value.trim().is_empty() {
        return Err(CoreError::Validation("value must not be empty".into()).into());
    }

    let list = state.catalogs.add(kind, &input.value).await?;
    tracing::info!(catalog = %kind, value = %input.value.trim(), "Catalog item added");

    Ok(Json(DataResponse { data: list }))
}

/// DELETE /api/v1/catalogs/{kind}/{value}
pub async fn remove_catalog_item(
    State(state): State<AppState>,
    Path((kind, value)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    if !state.catalogs.list(kind).contains(&value) {
        return Err(CoreError::NotFound {
            entity: "catalog item",
            id: value,
        }
        .into());
    }

    let list = state.catalogs.remove(kind, &value).await?;
    tracing::info!(catalog = %kind, value = %value, "Catalog item removed");

    Ok(Json(DataResponse { data: list }))
}
