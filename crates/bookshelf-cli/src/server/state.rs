//! Application state for the web server.

use std::sync::Arc;
use tokio::sync::RwLock;

use bookshelf::{Bookshelf, NotificationRelay};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The loaded library. Writers: sort, search, paging, filters, reload.
    pub shelf: Arc<RwLock<Bookshelf>>,
    /// Relay for wiki reports and messenger notifications.
    pub relay: Arc<NotificationRelay>,
}

impl AppState {
    /// Create new application state.
    pub fn new(shelf: Bookshelf, relay: NotificationRelay) -> Self {
        Self {
            shelf: Arc::new(RwLock::new(shelf)),
            relay: Arc::new(relay),
        }
    }
}
