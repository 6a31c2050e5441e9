//! Axum application setup.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::handlers;
use super::state::AppState;

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration for local development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tables
        .route("/tables/:id", get(handlers::get_table))
        .route("/tables/:id/sort/:column", post(handlers::sort_table))
        .route("/tables/:id/search", post(handlers::search_table))
        // Catalog
        .route("/catalog/filter", post(handlers::filter_catalog))
        .route("/catalog/:code/history", get(handlers::get_history))
        .route("/catalog/:code/link", get(handlers::get_link))
        // Reports and data
        .route("/report", get(handlers::get_report))
        .route("/sync", post(handlers::post_sync))
        .route("/reload", post(handlers::post_reload));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}

/// Start the web server.
pub async fn run_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use bookshelf::{Bookshelf, LoadedData, NotificationRelay, RelayConfig, Settings, Sheet, SourceKind};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn shelf() -> Bookshelf {
        let data = LoadedData {
            source: SourceKind::Csv,
            loan_log: sheet(&[
                &["대출일", "코드", "대출자", "상태"],
                &["2024-06-01", "B001", "Kim", "대출"],
                &["2024-06-03", "B002", "Lee", "대출"],
                &["2024-06-10", "B002", "Lee", "반납"],
            ]),
            catalog: sheet(&[
                &["코드", "제목", "저자"],
                &["B001", "Demian", "Hesse"],
                &["B002", "Emma", "Austen"],
                &["B003", "Dune", "Herbert"],
            ]),
            metadata: Vec::new(),
            fallback_error: None,
        };
        Bookshelf::from_data(Settings::default(), data).unwrap()
    }

    fn state() -> AppState {
        let relay = NotificationRelay::http(RelayConfig::default()).unwrap();
        AppState::new(shelf(), relay)
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_get_table() {
        let (status, body) = call(create_router(state()), "GET", "/api/tables/catalog", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"], "catalog");
        assert_eq!(body["rows"].as_array().unwrap().len(), 3);
        assert_eq!(body["header"].as_array().unwrap().last().unwrap(), "QR");

        let (status, body) = call(create_router(state()), "GET", "/api/tables/loans?page=9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["current"], 1);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let (status, body) = call(create_router(state()), "GET", "/api/tables/shelf", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_sort_and_search_share_state() {
        let state = state();

        let (status, body) = call(create_router(state.clone()), "POST", "/api/tables/catalog/sort/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"][0]["cells"][1], "Demian");

        let (_, body) = call(create_router(state.clone()), "POST", "/api/tables/catalog/sort/1", None).await;
        assert_eq!(body["rows"][0]["cells"][1], "Emma");
        assert_eq!(body["sort"][1], "descending");

        let (_, body) = call(
            create_router(state.clone()),
            "POST",
            "/api/tables/catalog/search",
            Some(json!({ "query": "HER" })),
        )
        .await;
        assert_eq!(body["pagination"]["total_items"], 1);
        assert_eq!(body["rows"][0]["cells"][0], "B003");

        let (status, _) = call(create_router(state), "POST", "/api/tables/catalog/sort/99", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_filter_catalog() {
        let (status, body) = call(
            create_router(state()),
            "POST",
            "/api/catalog/filter",
            Some(json!({ "on_loan_only": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"].as_array().unwrap().len(), 1);
        assert_eq!(body["rows"][0]["cells"][0], "B001");
        assert_eq!(body["rows"][0]["style"], "overdue");

        // No registration date column.
        let (status, body) = call(
            create_router(state()),
            "POST",
            "/api/catalog/filter",
            Some(json!({ "recent_only": true })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "data_error");
    }

    #[tokio::test]
    async fn test_history_and_link() {
        let (status, body) = call(create_router(state()), "GET", "/api/catalog/B002/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"].as_array().unwrap().len(), 2);
        assert_eq!(body["book"]["title"], "Emma");

        let (status, _) = call(create_router(state()), "GET", "/api/catalog/Z999/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(create_router(state()), "GET", "/api/catalog/B001/link", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["link"].as_str().unwrap().contains("usp=pp_url"));

        let (status, _) = call(create_router(state()), "GET", "/api/catalog/Z999/link", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report() {
        let (status, body) = call(create_router(state()), "GET", "/api/report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total"], 3);
        assert_eq!(body["summary"]["unreturned"].as_array().unwrap().len(), 1);
        assert!(body["markdown"].as_str().unwrap().starts_with("# Library status"));
    }

    #[tokio::test]
    async fn test_sync_without_backend() {
        let (status, body) = call(create_router(state()), "POST", "/api/sync", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "config_error");
    }

    #[tokio::test]
    async fn test_sync_in_flight_does_not_block_writers() {
        // A backend that accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let backend = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let relay = NotificationRelay::http(RelayConfig {
            backend_url: Some(format!("http://{}/exec", addr)),
            wiki_id: Some("wiki".to_string()),
            page_id: Some("page".to_string()),
            ..RelayConfig::default()
        })
        .unwrap();
        let state = AppState::new(shelf(), relay);

        let request = Request::builder()
            .method("POST")
            .uri("/api/sync")
            .body(Body::empty())
            .unwrap();
        let sync = tokio::spawn(create_router(state.clone()).oneshot(request));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!sync.is_finished());

        let writer = tokio::time::timeout(Duration::from_secs(2), state.shelf.write()).await;
        assert!(writer.is_ok());

        sync.abort();
        backend.abort();
    }

    #[tokio::test]
    async fn test_reload_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("books.csv"),
            "대출일,코드,대출자,상태\n2024-06-01,B001,Kim,반납\n2024-06-20,B003,Park,대출\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("library.csv"), "코드,제목\nB001,Demian\nB003,Dune\n").unwrap();

        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();
        // Previous load: B001 out, B003 on the shelf.
        let shelf = Bookshelf::from_data(settings, previous_data()).unwrap();
        let state = AppState::new(shelf, NotificationRelay::http(RelayConfig::default()).unwrap());

        let (status, body) = call(create_router(state), "POST", "/api/reload", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "csv");
        assert_eq!(body["books"], 2);
        let actions: Vec<&str> = body["changes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, vec!["return", "borrow"]);
        assert_eq!(body["notified"], 0);
    }

    fn previous_data() -> LoadedData {
        LoadedData {
            source: SourceKind::Csv,
            loan_log: sheet(&[&["대출일", "코드", "대출자", "상태"], &["2024-06-01", "B001", "Kim", "대출"]]),
            catalog: sheet(&[&["코드", "제목"], &["B001", "Demian"], &["B003", "Dune"]]),
            metadata: Vec::new(),
            fallback_error: None,
        }
    }
}
