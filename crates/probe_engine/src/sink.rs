use std::sync::mpsc;

use probe_core::ProbeStatus;

/// Caller-owned receiver of per-URL status transitions.
///
/// The dispatcher calls `notify` on every transition and guarantees only
/// that notifications for a given URL arrive in the order its transitions
/// occur. Implementations decide the presentation and threading model, and
/// may fan one URL out to several display rows.
pub trait StatusSink: Send + Sync {
    fn notify(&self, url: &str, status: &ProbeStatus);
}

/// One delivered status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub url: String,
    pub status: ProbeStatus,
}

/// Sink that forwards every transition over a channel.
pub struct ChannelStatusSink {
    tx: mpsc::Sender<StatusChange>,
}

impl ChannelStatusSink {
    pub fn new(tx: mpsc::Sender<StatusChange>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelStatusSink {
    fn notify(&self, url: &str, status: &ProbeStatus) {
        let _ = self.tx.send(StatusChange {
            url: url.to_string(),
            status: status.clone(),
        });
    }
}
