//! Correlation of callback-relay responses with pending requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{BookshelfError, Result};

/// Prefix of every generated callback name.
pub const CALLBACK_PREFIX: &str = "jsonp_callback_";

static SCRIPT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*([A-Za-z_$][\w$]*)\s*\((.*)\)\s*;?\s*$").unwrap());

type Pending = HashMap<String, oneshot::Sender<Value>>;

/// Pending callbacks, keyed by callback name.
///
/// Cloning shares the same map. The lock is only held for map edits, never
/// across an await.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    pending: Arc<Mutex<Pending>>,
}

/// Removes its callback from the registry when dropped.
#[derive(Debug)]
pub struct CallbackGuard {
    name: String,
    pending: Arc<Mutex<Pending>>,
}

impl CallbackGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CallbackGuard {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.remove(&self.name).is_some() {
            debug!(callback = %self.name, "Removed unanswered callback");
        }
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new uniquely named callback.
    ///
    /// The returned receiver resolves when a script naming the callback is
    /// dispatched. Dropping the guard unregisters it.
    pub fn register(&self) -> (CallbackGuard, oneshot::Receiver<Value>) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.lock();

        let millis = Utc::now().timestamp_millis();
        let mut name = format!("{}{}_{}", CALLBACK_PREFIX, millis, fastrand::u32(..));
        while pending.contains_key(&name) {
            name = format!("{}{}_{}", CALLBACK_PREFIX, millis, fastrand::u32(..));
        }
        pending.insert(name.clone(), tx);

        let guard = CallbackGuard {
            name,
            pending: Arc::clone(&self.pending),
        };
        (guard, rx)
    }

    /// Parse a `name(json);` script and deliver the payload to its callback.
    pub fn dispatch_script(&self, script: &str) -> Result<()> {
        let captures = SCRIPT_PATTERN.captures(script).ok_or_else(|| {
            BookshelfError::Transport("Relay response is not a callback invocation".to_string())
        })?;
        let name = &captures[1];
        let payload: Value = serde_json::from_str(captures[2].trim())?;
        self.dispatch(name, payload)
    }

    /// Deliver `payload` to the callback called `name`.
    pub fn dispatch(&self, name: &str, payload: Value) -> Result<()> {
        let sender = self.lock().remove(name).ok_or_else(|| {
            BookshelfError::Transport(format!("No pending callback named '{}'", name))
        })?;
        // The receiver may already be gone after a timeout.
        let _ = sender.send(payload);
        Ok(())
    }

    /// Number of callbacks still waiting.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_are_unique() {
        let registry = CallbackRegistry::new();
        let guards: Vec<_> = (0..50).map(|_| registry.register()).collect();
        let mut names: Vec<&str> = guards.iter().map(|(g, _)| g.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 50);
        assert!(names.iter().all(|n| n.starts_with(CALLBACK_PREFIX)));
    }

    #[test]
    fn test_guard_unregisters() {
        let registry = CallbackRegistry::new();
        let (guard, _rx) = registry.register();
        let name = guard.name().to_string();
        assert!(registry.is_registered(&name));
        drop(guard);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_script() {
        let registry = CallbackRegistry::new();
        let (guard, rx) = registry.register();
        let script = format!("{}({{\"success\":true,\"message\":\"ok\"}});", guard.name());

        registry.dispatch_script(&script).unwrap();
        assert_eq!(rx.await.unwrap(), json!({"success": true, "message": "ok"}));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispatch_unknown_or_malformed() {
        let registry = CallbackRegistry::new();
        assert!(matches!(
            registry.dispatch_script("other_callback({})"),
            Err(BookshelfError::Transport(_))
        ));
        assert!(matches!(
            registry.dispatch_script("<html>error</html>"),
            Err(BookshelfError::Transport(_))
        ));
    }
}
