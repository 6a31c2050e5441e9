//! The notification relay: POST first, callback-relay GET otherwise.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{BookshelfError, Result};

use super::callbacks::{CallbackGuard, CallbackRegistry, CALLBACK_PREFIX};
use super::summary::shorten_content;
use super::transport::{HttpTransport, RelayTransport};

/// Content longer than this (in characters) is POSTed.
pub const POST_CONTENT_THRESHOLD: usize = 1000;

/// Non-content query parameters are cut to this many characters.
pub const PARAM_TRUNCATE_LIMIT: usize = 500;

/// Callback-relay URLs longer than this switch to POST.
pub const MAX_URL_LENGTH: usize = 2000;

/// Deadline of a callback-relay request.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline of the single fallback request after a failed POST.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

const TRUNCATION_MARKER: &str = "...[truncated]";
const BOT_NAME: &str = "Library bot";

/// Where relay requests go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub backend_url: Option<String>,
    pub wiki_id: Option<String>,
    pub page_id: Option<String>,
    pub enable_messaging: bool,
    pub messenger_channel: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RelayConfig {
    /// The backend URL, or [`BookshelfError::ConfigMissing`].
    pub fn backend_url(&self) -> Result<&str> {
        non_empty(&self.backend_url).ok_or_else(|| {
            BookshelfError::ConfigMissing("backend URL is not set (backend_url)".to_string())
        })
    }

    /// Wiki and page ids, when both are set.
    pub fn target(&self) -> Option<(&str, &str)> {
        Some((non_empty(&self.wiki_id)?, non_empty(&self.page_id)?))
    }

    /// Whether every value needed to send is present.
    pub fn is_enabled(&self) -> bool {
        self.backend_url().is_ok() && self.target().is_some()
    }
}

/// A backend answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl RelayResponse {
    /// Interpret a payload, rejecting ones that carry an `error`.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let response: RelayResponse = serde_json::from_value(payload)?;
        match &response.error {
            None | Some(Value::Null) => Ok(response),
            Some(Value::String(message)) => Err(BookshelfError::Backend(message.clone())),
            Some(other) => Err(BookshelfError::Backend(other.to_string())),
        }
    }
}

/// Outcome of [`NotificationRelay::test_connection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ConnectionReport {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// A circulation event worth a messenger notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookAction {
    Borrow,
    Return,
    Overdue,
}

impl fmt::Display for BookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookAction::Borrow => write!(f, "borrow"),
            BookAction::Return => write!(f, "return"),
            BookAction::Overdue => write!(f, "overdue"),
        }
    }
}

impl FromStr for BookAction {
    type Err = BookshelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "borrow" | "loan" => Ok(BookAction::Borrow),
            "return" => Ok(BookAction::Return),
            "overdue" => Ok(BookAction::Overdue),
            _ => Err(BookshelfError::Config(format!(
                "Unknown book action: {}. Use borrow, return or overdue.",
                s
            ))),
        }
    }
}

/// Book fields quoted in a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub code: String,
    pub title: String,
    pub author: String,
    pub borrower: String,
}

impl BookAction {
    /// Messenger text for this event.
    pub fn message(self, book: &BookInfo, now: NaiveDateTime) -> String {
        let time = now.format("%Y-%m-%d %H:%M");
        match self {
            BookAction::Borrow => format!(
                "**Book borrowed**\n- Book: {}\n- Author: {}\n- Borrower: {}\n- Code: {}\n- Time: {}",
                book.title, book.author, book.borrower, book.code, time
            ),
            BookAction::Return => format!(
                "**Book returned**\n- Book: {}\n- Author: {}\n- Returned by: {}\n- Code: {}\n- Time: {}",
                book.title, book.author, book.borrower, book.code, time
            ),
            BookAction::Overdue => format!(
                "**Overdue book**\n- Book: {}\n- Author: {}\n- Borrower: {}\n- Code: {}\n- Status: past due date",
                book.title, book.author, book.borrower, book.code
            ),
        }
    }
}

/// Sends actions to the wiki/messenger backend.
///
/// Long content is POSTed as JSON. Everything else goes through the
/// callback relay: a GET whose response script invokes a uniquely named
/// callback. A failed POST is retried exactly once through the callback
/// relay with the content shortened.
pub struct NotificationRelay<T = HttpTransport> {
    transport: T,
    config: RelayConfig,
    callbacks: CallbackRegistry,
    callback_timeout: Duration,
    fallback_timeout: Duration,
}

impl NotificationRelay<HttpTransport> {
    /// Create a relay over HTTP.
    pub fn http(config: RelayConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new()?, config))
    }
}

impl<T: RelayTransport> NotificationRelay<T> {
    pub fn new(transport: T, config: RelayConfig) -> Self {
        Self {
            transport,
            config,
            callbacks: CallbackRegistry::new(),
            callback_timeout: CALLBACK_TIMEOUT,
            fallback_timeout: FALLBACK_TIMEOUT,
        }
    }

    /// Override the callback and fallback deadlines.
    pub fn with_timeouts(mut self, callback: Duration, fallback: Duration) -> Self {
        self.callback_timeout = callback;
        self.fallback_timeout = fallback;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Callbacks awaiting an answer.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Send `action` with `params`.
    ///
    /// Resolves to `None` without sending when the wiki or page id is not
    /// configured. Fails with [`BookshelfError::ConfigMissing`] when the
    /// backend URL is not.
    pub async fn send(&self, action: &str, params: IndexMap<String, String>) -> Result<Option<RelayResponse>> {
        let backend = self.config.backend_url()?;
        let Some((wiki_id, page_id)) = self.config.target() else {
            warn!(action, "Wiki or page id not configured, skipping relay request");
            return Ok(None);
        };
        let target = Target {
            backend,
            action,
            wiki_id,
            page_id,
        };

        let content_length = params.get("content").map(|c| c.chars().count()).unwrap_or(0);
        if content_length > POST_CONTENT_THRESHOLD {
            info!(action, content_length, "Long content, sending as POST");
            return self.post_with_fallback(&target, &params).await.map(Some);
        }

        let (guard, rx) = self.callbacks.register();
        let url = target.callback_url(guard.name(), &params)?;
        if url.len() > MAX_URL_LENGTH {
            warn!(action, url_length = url.len(), "Relay URL too long, switching to POST");
            drop(guard);
            return self.post_with_fallback(&target, &params).await.map(Some);
        }

        self.await_callback(&url, guard, rx, self.callback_timeout)
            .await
            .map(Some)
    }

    /// Publish a markdown report to the configured wiki page.
    pub async fn update_wiki(&self, content: &str) -> Result<Option<RelayResponse>> {
        let mut params = IndexMap::new();
        params.insert("content".to_string(), content.to_string());
        self.send("updateWiki", params).await
    }

    /// Check that the backend answers. Never fails; problems are reported in
    /// the returned [`ConnectionReport`].
    pub async fn test_connection(&self) -> ConnectionReport {
        match self.send("test", IndexMap::new()).await {
            Ok(Some(response)) if response.success => ConnectionReport {
                success: true,
                message: response.message.unwrap_or_else(|| "Connected".to_string()),
                data: response.data,
            },
            Ok(Some(response)) => ConnectionReport::failure(
                response
                    .message
                    .unwrap_or_else(|| "Backend connection failed".to_string()),
            ),
            Ok(None) => ConnectionReport::failure("Wiki and page ids are not configured"),
            Err(e @ BookshelfError::ConfigMissing(_)) => ConnectionReport::failure(format!(
                "Connection test failed: {}\n\nDeploy the sheet backend as a web app, copy its URL and set it as backend_url.",
                e
            )),
            Err(e) => ConnectionReport::failure(format!("Connection test failed: {}", e)),
        }
    }

    /// Send a messenger notification for a circulation event.
    ///
    /// Returns `false` without sending when messaging is disabled or no
    /// channel is configured, and `false` when sending fails.
    pub async fn notify_book_action(&self, action: BookAction, book: &BookInfo) -> bool {
        if !self.config.enable_messaging {
            info!(%action, code = %book.code, "Messaging disabled, notification not sent");
            return false;
        }
        let Some(channel) = non_empty(&self.config.messenger_channel) else {
            warn!(%action, "Messenger channel not configured");
            return false;
        };

        let mut params = IndexMap::new();
        params.insert("channelId".to_string(), channel.to_string());
        params.insert("text".to_string(), action.message(book, Local::now().naive_local()));
        params.insert("botName".to_string(), BOT_NAME.to_string());

        match self.send("sendMessage", params).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!(%action, error = %e, "Failed to send notification");
                false
            }
        }
    }

    async fn await_callback(
        &self,
        url: &str,
        guard: CallbackGuard,
        rx: oneshot::Receiver<Value>,
        deadline: Duration,
    ) -> Result<RelayResponse> {
        debug!(callback = %guard.name(), url_length = url.len(), "Awaiting callback");

        let exchange = async {
            let script = self.transport.fetch_script(url).await?;
            self.callbacks.dispatch_script(&script)?;
            rx.await
                .map_err(|_| BookshelfError::Transport("Callback dropped before firing".to_string()))
        };

        let payload = tokio::time::timeout(deadline, exchange)
            .await
            .map_err(|_| BookshelfError::Timeout(deadline))??;
        RelayResponse::from_payload(payload)
    }

    async fn post_with_fallback(&self, target: &Target<'_>, params: &IndexMap<String, String>) -> Result<RelayResponse> {
        let body = target.post_body(params);

        let post = tokio::time::timeout(
            self.callback_timeout,
            self.transport.post_json(target.backend, &body),
        )
        .await;
        let post_error = match post {
            Ok(Ok(payload)) => match RelayResponse::from_payload(payload) {
                Err(BookshelfError::Json(e)) => format!("unparseable response: {}", e),
                other => return other,
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => BookshelfError::Timeout(self.callback_timeout).to_string(),
        };
        warn!(action = target.action, error = %post_error, "POST failed, falling back to callback relay");

        let mut fallback = params.clone();
        if let Some(content) = fallback.get_mut("content") {
            *content = shorten_content(content, Local::now().naive_local());
        }

        let (guard, rx) = self.callbacks.register();
        let url = target.callback_url(guard.name(), &fallback)?;
        self.await_callback(&url, guard, rx, self.fallback_timeout)
            .await
            .map_err(|e| match e {
                BookshelfError::Backend(_) => e,
                other => BookshelfError::Transport(format!(
                    "POST failed ({}) and callback fallback failed ({})",
                    post_error, other
                )),
            })
    }
}

struct Target<'a> {
    backend: &'a str,
    action: &'a str,
    wiki_id: &'a str,
    page_id: &'a str,
}

impl Target<'_> {
    fn callback_url(&self, callback: &str, params: &IndexMap<String, String>) -> Result<String> {
        let mut url = Url::parse(self.backend)
            .map_err(|e| BookshelfError::Config(format!("Invalid backend URL '{}': {}", self.backend, e)))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("action", self.action)
                .append_pair("wikiId", self.wiki_id)
                .append_pair("pageId", self.page_id)
                .append_pair("callback", callback);
            for (key, value) in params {
                if key == "content" {
                    query.append_pair(key, value);
                } else {
                    query.append_pair(key, &truncate_param(value));
                }
            }
        }
        Ok(url.into())
    }

    fn post_body(&self, params: &IndexMap<String, String>) -> Value {
        let mut body = Map::new();
        body.insert("action".to_string(), Value::from(self.action));
        body.insert("wikiId".to_string(), Value::from(self.wiki_id));
        body.insert("pageId".to_string(), Value::from(self.page_id));
        body.insert(
            "callback".to_string(),
            Value::from(format!("{}{}", CALLBACK_PREFIX, Utc::now().timestamp_millis())),
        );
        for (key, value) in params {
            body.insert(key.clone(), Value::from(value.as_str()));
        }
        Value::Object(body)
    }
}

fn truncate_param(value: &str) -> String {
    if value.chars().count() > PARAM_TRUNCATE_LIMIT {
        let head: String = value.chars().take(PARAM_TRUNCATE_LIMIT).collect();
        format!("{}{}", head, TRUNCATION_MARKER)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> Target<'static> {
        Target {
            backend: "https://relay.example.com/exec",
            action: "updateWiki",
            wiki_id: "w1",
            page_id: "p1",
        }
    }

    #[test]
    fn test_truncate_param() {
        assert_eq!(truncate_param("short"), "short");
        let long = "가".repeat(600);
        let cut = truncate_param(&long);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(cut.chars().count(), PARAM_TRUNCATE_LIMIT + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_callback_url_fields() {
        let mut params = IndexMap::new();
        params.insert("note".to_string(), "x".repeat(700));
        params.insert("content".to_string(), "y".repeat(700));
        let url = target().callback_url("jsonp_callback_1_2", &params).unwrap();

        assert!(url.starts_with(
            "https://relay.example.com/exec?action=updateWiki&wikiId=w1&pageId=p1&callback=jsonp_callback_1_2"
        ));
        assert!(url.contains(&format!("note={}...%5Btruncated%5D", "x".repeat(500))));
        assert!(url.contains(&format!("content={}", "y".repeat(700))));
    }

    #[test]
    fn test_post_body() {
        let mut params = IndexMap::new();
        params.insert("content".to_string(), "hello".to_string());
        let body = target().post_body(&params);
        assert_eq!(body["action"], "updateWiki");
        assert_eq!(body["wikiId"], "w1");
        assert_eq!(body["content"], "hello");
        assert!(body["callback"].as_str().unwrap().starts_with(CALLBACK_PREFIX));
    }

    #[test]
    fn test_response_error_is_backend_error() {
        let err = RelayResponse::from_payload(json!({"error": "page locked"})).unwrap_err();
        assert!(matches!(err, BookshelfError::Backend(ref m) if m == "page locked"));
        assert!(RelayResponse::from_payload(json!({"success": true, "error": null})).is_ok());
    }

    #[test]
    fn test_config_checks() {
        let mut config = RelayConfig::default();
        assert!(matches!(config.backend_url(), Err(BookshelfError::ConfigMissing(_))));
        config.backend_url = Some("https://relay.example.com/exec".to_string());
        config.wiki_id = Some("w1".to_string());
        assert!(!config.is_enabled());
        config.page_id = Some(" p1 ".to_string());
        assert_eq!(config.target(), Some(("w1", "p1")));
        assert!(config.is_enabled());
    }

    #[test]
    fn test_book_action_message() {
        let book = BookInfo {
            code: "B001".to_string(),
            title: "Demian".to_string(),
            author: "Hesse".to_string(),
            borrower: "Kim".to_string(),
        };
        let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        let text = BookAction::Borrow.message(&book, now);
        assert!(text.starts_with("**Book borrowed**"));
        assert!(text.contains("- Time: 2024-06-30 09:05"));
        assert!(BookAction::Overdue.message(&book, now).contains("past due date"));
        assert_eq!("Return".parse::<BookAction>().unwrap(), BookAction::Return);
    }
}
