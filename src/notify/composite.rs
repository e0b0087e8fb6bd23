use tracing::debug;

use crate::notify::{Notification, NotificationSink};
use crate::types::BoxFuture;

/// Sends every notification to all member sinks, in order.
///
/// Succeeds if at least one member accepted the notification. Members are
/// always all attempted, even after an early success.
pub struct CompositeSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl NotificationSink for CompositeSink {
    fn name(&self) -> &str {
        "composite"
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let mut delivered = 0usize;
            for sink in &self.sinks {
                if sink.send(notification).await {
                    delivered += 1;
                }
            }
            debug!(
                delivered,
                members = self.sinks.len(),
                "composite notification dispatched"
            );
            delivered > 0
        })
    }
}
