//! Notification adapters - outbound delivery side channel.
//!
//! - `dispatcher` - Background service draining the post-commit queue
//! - `http_notifier` - Client for the platform's notification service

mod dispatcher;
mod http_notifier;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use http_notifier::{HttpNotifier, NotifierConfig};
