//! Catalog handlers: filters, per-book history and intake links.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use bookshelf::intake::IntakeFields;
use bookshelf::status::HistoryEntry;
use bookshelf::{BookshelfError, CatalogFilter, TableId, TableView};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Response for the history endpoint.
#[derive(Serialize)]
pub struct HistoryResponse {
    pub code: String,
    /// Catalog fields, when the code is in the catalog.
    pub book: Option<IntakeFields>,
    pub entries: Vec<HistoryEntry>,
}

/// Response for the intake link endpoint.
#[derive(Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub link: String,
    pub fields: Option<IntakeFields>,
}

/// POST /api/catalog/filter
pub async fn filter_catalog(
    State(state): State<AppState>,
    Json(filter): Json<CatalogFilter>,
) -> Result<Json<TableView>, ApiError> {
    let mut shelf = state.shelf.write().await;
    shelf.apply_filter(filter)?;
    Ok(Json(shelf.view(TableId::Catalog)))
}

/// GET /api/catalog/:code/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let shelf = state.shelf.read().await;
    let entries = shelf.history(&code)?;
    let book = shelf.intake_fields(&code);

    if entries.is_empty() && book.is_none() {
        return Err(ApiError::NotFound(format!("No book or loans with code: {}", code)));
    }

    Ok(Json(HistoryResponse {
        code: code.trim().to_string(),
        book,
        entries,
    }))
}

/// GET /api/catalog/:code/link
pub async fn get_link(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LinkResponse>, ApiError> {
    let shelf = state.shelf.read().await;
    let link = shelf.intake_link(&code).map_err(|e| match e {
        BookshelfError::EmptyData(msg) => ApiError::NotFound(msg),
        other => ApiError::from(other),
    })?;

    Ok(Json(LinkResponse {
        code: code.trim().to_string(),
        link,
        fields: shelf.intake_fields(&code),
    }))
}
