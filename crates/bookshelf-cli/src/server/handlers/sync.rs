//! Report, sync and reload handlers.

use axum::{extract::State, Json};
use chrono::Local;
use serde::Serialize;

use bookshelf::{
    circulation_changes, data_loader, publish_report, BookAction, BookInfo, RelayResponse, SourceKind,
    StatusSummary,
};

use crate::commands::watch::notify_changes;
use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Response for the report endpoint.
#[derive(Serialize)]
pub struct ReportResponse {
    pub summary: StatusSummary,
    /// Markdown published to the wiki by a sync.
    pub markdown: String,
}

/// Response for the sync endpoint.
#[derive(Serialize)]
pub struct SyncResponse {
    /// False when the wiki target is not configured.
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<RelayResponse>,
}

/// One circulation change found by a reload.
#[derive(Serialize)]
pub struct ChangeEntry {
    pub action: BookAction,
    pub book: BookInfo,
}

/// Response for the reload endpoint.
#[derive(Serialize)]
pub struct ReloadResponse {
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_error: Option<String>,
    pub books: usize,
    pub changes: Vec<ChangeEntry>,
    /// Messenger notifications delivered for the changes.
    pub notified: usize,
}

/// GET /api/report
pub async fn get_report(State(state): State<AppState>) -> Json<ReportResponse> {
    let shelf = state.shelf.read().await;
    Json(ReportResponse {
        summary: shelf.summary(),
        markdown: shelf.report_markdown(),
    })
}

/// POST /api/sync
pub async fn post_sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    // Build the report under the lock, publish after releasing it.
    let content = state.shelf.read().await.report_markdown();
    let response = publish_report(state.relay.as_ref(), &content).await?;

    Ok(Json(SyncResponse {
        sent: response.is_some(),
        response,
    }))
}

/// POST /api/reload
pub async fn post_reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    // Load without holding the lock; readers keep the old data meanwhile.
    let settings = state.shelf.read().await.settings().clone();
    let data = data_loader(&settings)?.load().await?;

    let changes = {
        let mut shelf = state.shelf.write().await;
        let previous = shelf.catalog().clone();
        shelf.replace_data(data, Local::now().naive_local())?;
        circulation_changes(&previous, shelf.catalog())
    };

    let notified = if settings.notify_on_loan {
        notify_changes(state.relay.as_ref(), &changes).await
    } else {
        0
    };

    let shelf = state.shelf.read().await;
    let info = shelf.load_info();
    Ok(Json(ReloadResponse {
        source: info.source,
        fallback_error: info.fallback_error.clone(),
        books: shelf.catalog().entries.len(),
        changes: changes
            .into_iter()
            .map(|(action, book)| ChangeEntry { action, book })
            .collect(),
        notified,
    }))
}
