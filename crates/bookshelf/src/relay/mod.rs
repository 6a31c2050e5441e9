//! Notification relay to the wiki/messenger backend.
//!
//! Requests carry an action plus wiki and page ids. Content over 1000
//! characters is POSTed as JSON; anything else uses the callback relay, a
//! GET answered by a script that invokes a one-shot callback. Pending
//! callbacks live in a [`CallbackRegistry`] owned by the relay and are
//! removed on every exit path.

mod callbacks;
mod mock;
mod notifier;
mod summary;
mod transport;

pub use callbacks::{CallbackGuard, CallbackRegistry, CALLBACK_PREFIX};
pub use mock::{MockReply, MockTransport};
pub use notifier::{
    BookAction, BookInfo, ConnectionReport, NotificationRelay, RelayConfig, RelayResponse,
    CALLBACK_TIMEOUT, FALLBACK_TIMEOUT, MAX_URL_LENGTH, PARAM_TRUNCATE_LIMIT,
    POST_CONTENT_THRESHOLD,
};
pub use summary::{shorten_content, SHORT_CONTENT_LIMIT};
pub use transport::{HttpTransport, RelayTransport};
