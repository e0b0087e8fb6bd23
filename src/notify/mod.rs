//! Lifecycle notifications.
//!
//! - [`NotificationSink`] is the delivery seam; [`DingtalkSink`] (signed
//!   markdown webhook) and [`NtfySink`] (topic push) are the concrete
//!   backends, and [`CompositeSink`] fans out to several of them.
//! - [`factory`] picks the sinks from configuration.
//! - [`events`] formats start / success / failure messages.
//!
//! Delivery never fails the run: sinks log their own errors and report
//! `false`.

pub mod composite;
pub mod dingtalk;
pub mod events;
pub mod factory;
pub mod ntfy;

pub use composite::CompositeSink;
pub use dingtalk::DingtalkSink;
pub use events::{Notifier, RunSummary};
pub use factory::{build_sink, resolve_active_kinds};
pub use ntfy::NtfySink;

use crate::types::{BoxFuture, Priority};

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    /// Comma separated tag names (emoji short codes for ntfy).
    pub tags: String,
    pub priority: Priority,
}

/// A notification delivery backend.
pub trait NotificationSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver `notification`; `true` if the backend accepted it.
    ///
    /// Implementations must not panic or propagate errors.
    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, bool>;
}
