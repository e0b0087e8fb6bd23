//! Sink selection from the `notification` config section.

use tracing::{debug, warn};

use crate::config::LabConfig;
use crate::notify::{CompositeSink, DingtalkSink, NotificationSink, NtfySink};
use crate::types::SinkKind;

/// Which sinks to instantiate.
///
/// An explicit `notification.active` list is used as given (in order). When
/// it is absent, the first sink with its required setting filled in wins:
/// DingTalk `webhook_url`, then ntfy `topic`.
pub fn resolve_active_kinds(cfg: &LabConfig) -> Vec<SinkKind> {
    if let Some(kinds) = &cfg.active_sinks {
        return kinds.clone();
    }

    let notification = &cfg.notification;
    if !notification.dingtalk.webhook_url.trim().is_empty() {
        vec![SinkKind::Dingtalk]
    } else if !notification.ntfy.topic.trim().is_empty() {
        vec![SinkKind::Ntfy]
    } else {
        Vec::new()
    }
}

/// Build the sink used for all lifecycle events.
///
/// With nothing configured a DingTalk sink is still returned, so every send
/// logs the missing `webhook_url` instead of silently doing nothing.
pub fn build_sink(cfg: &LabConfig, client: &reqwest::Client) -> Box<dyn NotificationSink> {
    let kinds = resolve_active_kinds(cfg);
    debug!(?kinds, "active notification sinks");

    let mut sinks: Vec<Box<dyn NotificationSink>> = kinds
        .iter()
        .map(|kind| instantiate(*kind, cfg, client))
        .collect();

    match sinks.len() {
        0 => {
            warn!("no notification sink configured; notifications will fail");
            instantiate(SinkKind::Dingtalk, cfg, client)
        }
        1 => sinks.remove(0),
        _ => {
            let composite = CompositeSink::new(sinks);
            debug!(members = ?composite.member_names(), "fanning out to several sinks");
            Box::new(composite)
        }
    }
}

fn instantiate(
    kind: SinkKind,
    cfg: &LabConfig,
    client: &reqwest::Client,
) -> Box<dyn NotificationSink> {
    match kind {
        SinkKind::Dingtalk => Box::new(DingtalkSink::new(
            client.clone(),
            cfg.notification.dingtalk.clone(),
        )),
        SinkKind::Ntfy => Box::new(NtfySink::new(client.clone(), cfg.notification.ntfy.clone())),
    }
}
