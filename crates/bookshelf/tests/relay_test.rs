//! Integration tests for the notification relay against a scripted transport.

use std::time::Duration;

use indexmap::IndexMap;
use serde_json::json;
use url::Url;

use bookshelf::relay::{MockReply, MockTransport, CALLBACK_TIMEOUT, SHORT_CONTENT_LIMIT};
use bookshelf::{BookAction, BookInfo, BookshelfError, NotificationRelay, RelayConfig};

fn config() -> RelayConfig {
    RelayConfig {
        backend_url: Some("https://relay.example.com/exec".to_string()),
        wiki_id: Some("wiki-1".to_string()),
        page_id: Some("page-9".to_string()),
        enable_messaging: true,
        messenger_channel: Some("channel-3".to_string()),
    }
}

fn relay(transport: MockTransport) -> NotificationRelay<MockTransport> {
    NotificationRelay::new(transport, config())
}

/// A status report well past the POST threshold.
fn long_report() -> String {
    let mut report = String::from(
        "# Library status\n\n## Statistics\n\
         - **Total books**: 120\n\
         - **Unreturned books**: 7\n\
         - **Return rate**: 94.2%\n\n### Unreturned books\n",
    );
    for i in 0..40 {
        report.push_str(&format!("| B{:03} | Some long title {} | Author | Reader |\n", i, i));
    }
    report
}

fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn book() -> BookInfo {
    BookInfo {
        code: "B001".to_string(),
        title: "Demian".to_string(),
        author: "Hesse".to_string(),
        borrower: "Kim".to_string(),
    }
}

// =============================================================================
// Callback Relay Tests
// =============================================================================

#[tokio::test]
async fn test_short_content_uses_callback_relay() {
    let relay = relay(MockTransport::new());
    let response = relay.update_wiki("# Library status").await.unwrap().unwrap();

    assert!(response.success);
    assert_eq!(response.message.as_deref(), Some("ok"));
    assert!(relay.transport().posts().is_empty());

    let gets = relay.transport().gets();
    assert_eq!(gets.len(), 1);
    assert_eq!(query_param(&gets[0], "action").as_deref(), Some("updateWiki"));
    assert_eq!(query_param(&gets[0], "wikiId").as_deref(), Some("wiki-1"));
    assert_eq!(query_param(&gets[0], "pageId").as_deref(), Some("page-9"));
    assert!(query_param(&gets[0], "callback")
        .unwrap()
        .starts_with("jsonp_callback_"));
    assert!(relay.callbacks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_callback_timeout_cleans_up() {
    let relay = relay(MockTransport::new().with_get_reply(MockReply::Hang));

    let err = relay.update_wiki("# Library status").await.unwrap_err();
    assert!(matches!(err, BookshelfError::Timeout(d) if d == CALLBACK_TIMEOUT));
    assert!(relay.callbacks().is_empty());
}

#[tokio::test]
async fn test_foreign_callback_is_rejected() {
    let relay = relay(
        MockTransport::new().with_get_reply(MockReply::Raw("someone_else({\"success\":true});".to_string())),
    );

    let err = relay.update_wiki("hello").await.unwrap_err();
    assert!(matches!(err, BookshelfError::Transport(_)));
    assert!(relay.callbacks().is_empty());
}

#[tokio::test]
async fn test_backend_error_payload() {
    let relay = relay(MockTransport::new().with_get_reply(MockReply::Json(json!({
        "error": "Sheet not found"
    }))));

    match relay.update_wiki("hello").await {
        Err(BookshelfError::Backend(message)) => assert_eq!(message, "Sheet not found"),
        other => panic!("unexpected result: {:?}", other),
    }
}

// =============================================================================
// POST Tests
// =============================================================================

#[tokio::test]
async fn test_long_content_is_posted() {
    let relay = relay(MockTransport::new());
    let report = long_report();
    assert!(report.chars().count() > 1000);

    let response = relay.update_wiki(&report).await.unwrap().unwrap();
    assert!(response.success);

    let posts = relay.transport().posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["action"], "updateWiki");
    assert_eq!(posts[0]["content"], report.as_str());
    assert!(relay.transport().gets().is_empty());
}

#[tokio::test]
async fn test_long_url_switches_to_post() {
    let relay = relay(MockTransport::new());
    // Under the POST threshold, but percent-encoding makes the URL too long.
    let content = "가".repeat(900);

    relay.update_wiki(&content).await.unwrap();
    assert_eq!(relay.transport().posts().len(), 1);
    assert!(relay.transport().gets().is_empty());
    assert!(relay.callbacks().is_empty());
}

#[tokio::test]
async fn test_failed_post_falls_back_once_with_summary() {
    let relay = relay(MockTransport::new().with_post_reply(MockReply::Fail("HTTP 500".to_string())));

    let response = relay.update_wiki(&long_report()).await.unwrap().unwrap();
    assert!(response.success);
    assert_eq!(relay.transport().posts().len(), 1);

    let gets = relay.transport().gets();
    assert_eq!(gets.len(), 1);
    let content = query_param(&gets[0], "content").unwrap();
    assert!(content.chars().count() <= SHORT_CONTENT_LIMIT);
    assert!(content.starts_with("# Library status"));
    assert!(content.contains("- Total books: 120"));
    assert!(content.contains("- Return rate: 94.2%"));
    assert!(content.contains("7 books are not yet returned."));
}

#[tokio::test]
async fn test_unparseable_post_response_falls_back() {
    let relay = relay(MockTransport::new().with_post_reply(MockReply::Json(json!("not an object"))));

    relay.update_wiki(&long_report()).await.unwrap();
    assert_eq!(relay.transport().gets().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_both_paths_failing_reports_both() {
    let relay = relay(
        MockTransport::new()
            .with_post_reply(MockReply::Hang)
            .with_get_reply(MockReply::Hang),
    )
    .with_timeouts(Duration::from_secs(5), Duration::from_secs(2));

    match relay.update_wiki(&long_report()).await {
        Err(BookshelfError::Transport(message)) => {
            assert!(message.contains("POST failed"));
            assert!(message.contains("callback fallback failed"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(relay.transport().gets().len(), 1);
    assert!(relay.callbacks().is_empty());
}

#[tokio::test]
async fn test_backend_error_survives_fallback() {
    let relay = relay(
        MockTransport::new()
            .with_post_reply(MockReply::Fail("connection reset".to_string()))
            .with_get_reply(MockReply::Json(json!({ "error": "Page is locked" }))),
    );

    let err = relay.update_wiki(&long_report()).await.unwrap_err();
    assert!(matches!(err, BookshelfError::Backend(m) if m == "Page is locked"));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[tokio::test]
async fn test_missing_backend_url() {
    let relay = NotificationRelay::new(
        MockTransport::new(),
        RelayConfig {
            backend_url: Some("  ".to_string()),
            ..config()
        },
    );

    let err = relay.send("test", IndexMap::new()).await.unwrap_err();
    assert!(matches!(err, BookshelfError::ConfigMissing(_)));
    assert!(relay.transport().gets().is_empty());
}

#[tokio::test]
async fn test_missing_target_skips_request() {
    let relay = NotificationRelay::new(
        MockTransport::new(),
        RelayConfig {
            page_id: None,
            ..config()
        },
    );

    assert!(relay.update_wiki("hello").await.unwrap().is_none());
    assert!(relay.transport().gets().is_empty());
    assert!(relay.transport().posts().is_empty());
}

#[tokio::test]
async fn test_connection_report() {
    let ok = relay(MockTransport::new().with_get_reply(MockReply::Json(json!({
        "success": true,
        "message": "Connected to wiki",
        "data": { "version": 3 }
    }))))
    .test_connection()
    .await;
    assert!(ok.success);
    assert_eq!(ok.message, "Connected to wiki");
    assert_eq!(ok.data, Some(json!({ "version": 3 })));

    let unconfigured = NotificationRelay::new(MockTransport::new(), RelayConfig::default())
        .test_connection()
        .await;
    assert!(!unconfigured.success);
    assert!(unconfigured.message.contains("backend_url"));
}

// =============================================================================
// Messenger Tests
// =============================================================================

#[tokio::test]
async fn test_notify_book_action_sends_message() {
    let relay = relay(MockTransport::new());
    assert!(relay.notify_book_action(BookAction::Borrow, &book()).await);

    let gets = relay.transport().gets();
    assert_eq!(gets.len(), 1);
    assert_eq!(query_param(&gets[0], "action").as_deref(), Some("sendMessage"));
    assert_eq!(query_param(&gets[0], "channelId").as_deref(), Some("channel-3"));
    assert_eq!(query_param(&gets[0], "botName").as_deref(), Some("Library bot"));
    let text = query_param(&gets[0], "text").unwrap();
    assert!(text.contains("Book borrowed"));
    assert!(text.contains("Demian"));
}

#[tokio::test]
async fn test_notify_disabled_or_failing() {
    let disabled = NotificationRelay::new(
        MockTransport::new(),
        RelayConfig {
            enable_messaging: false,
            ..config()
        },
    );
    assert!(!disabled.notify_book_action(BookAction::Return, &book()).await);
    assert!(disabled.transport().gets().is_empty());

    let no_channel = NotificationRelay::new(
        MockTransport::new(),
        RelayConfig {
            messenger_channel: None,
            ..config()
        },
    );
    assert!(!no_channel.notify_book_action(BookAction::Return, &book()).await);

    let failing = relay(MockTransport::new().with_get_reply(MockReply::Fail("offline".to_string())));
    assert!(!failing.notify_book_action(BookAction::Overdue, &book()).await);
}
