//! Table handlers: paging, sorting and search.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use bookshelf::{TableId, TableView};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Query string for table pages.
#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

/// Request body for searching a table.
#[derive(Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

pub(crate) fn parse_table(id: &str) -> Result<TableId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown table: {}", id)))
}

/// GET /api/tables/:id
pub async fn get_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TableView>, ApiError> {
    let table = parse_table(&id)?;

    if let Some(page) = query.page {
        let mut shelf = state.shelf.write().await;
        shelf.go_to_page(table, page);
        return Ok(Json(shelf.view(table)));
    }

    let shelf = state.shelf.read().await;
    Ok(Json(shelf.view(table)))
}

/// POST /api/tables/:id/sort/:column
pub async fn sort_table(
    State(state): State<AppState>,
    Path((id, column)): Path<(String, usize)>,
) -> Result<Json<TableView>, ApiError> {
    let table = parse_table(&id)?;
    let mut shelf = state.shelf.write().await;

    if shelf.sort(table, column).is_none() {
        return Err(ApiError::BadRequest(format!(
            "Column {} is out of range for {} ({} columns)",
            column,
            table,
            shelf.table(table).header().len()
        )));
    }
    Ok(Json(shelf.view(table)))
}

/// POST /api/tables/:id/search
pub async fn search_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<TableView>, ApiError> {
    let table = parse_table(&id)?;
    let mut shelf = state.shelf.write().await;
    shelf.search(table, &req.query);
    Ok(Json(shelf.view(table)))
}
