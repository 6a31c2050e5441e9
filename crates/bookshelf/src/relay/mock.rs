//! Scripted relay transport for testing.

use std::sync::{Mutex, PoisonError};

use serde_json::{json, Value};
use url::Url;

use crate::error::{BookshelfError, Result};

use super::transport::RelayTransport;

/// How the mock answers one kind of request.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this JSON payload.
    Json(Value),
    /// Answer with this raw script text (GET only).
    Raw(String),
    /// Fail with a transport error.
    Fail(String),
    /// Never answer.
    Hang,
}

/// Transport that records requests and answers from a script.
#[derive(Debug)]
pub struct MockTransport {
    post_reply: MockReply,
    get_reply: MockReply,
    posts: Mutex<Vec<(String, Value)>>,
    gets: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a transport answering both kinds of request with `success: true`.
    pub fn new() -> Self {
        let ok = json!({ "success": true, "message": "ok" });
        Self {
            post_reply: MockReply::Json(ok.clone()),
            get_reply: MockReply::Json(ok),
            posts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
        }
    }

    /// Set the reply to POST requests.
    pub fn with_post_reply(mut self, reply: MockReply) -> Self {
        self.post_reply = reply;
        self
    }

    /// Set the reply to callback-relay GET requests.
    pub fn with_get_reply(mut self, reply: MockReply) -> Self {
        self.get_reply = reply;
        self
    }

    /// Bodies of the POST requests made so far.
    pub fn posts(&self) -> Vec<Value> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// URLs of the GET requests made so far.
    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayTransport for MockTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), body.clone()));

        match &self.post_reply {
            MockReply::Json(value) => Ok(value.clone()),
            MockReply::Raw(text) => serde_json::from_str(text)
                .map_err(|e| BookshelfError::Transport(format!("Unparseable POST response: {}", e))),
            MockReply::Fail(message) => Err(BookshelfError::Transport(message.clone())),
            MockReply::Hang => std::future::pending().await,
        }
    }

    async fn fetch_script(&self, url: &str) -> Result<String> {
        self.gets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        match &self.get_reply {
            MockReply::Json(value) => {
                let callback = Url::parse(url)
                    .ok()
                    .and_then(|u| {
                        u.query_pairs()
                            .find(|(k, _)| k == "callback")
                            .map(|(_, v)| v.into_owned())
                    })
                    .ok_or_else(|| BookshelfError::Transport("Request has no callback".to_string()))?;
                Ok(format!("{}({});", callback, value))
            }
            MockReply::Raw(text) => Ok(text.clone()),
            MockReply::Fail(message) => Err(BookshelfError::Transport(message.clone())),
            MockReply::Hang => std::future::pending().await,
        }
    }
}
