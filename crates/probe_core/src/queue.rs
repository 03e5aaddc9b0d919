use std::collections::VecDeque;

use crate::request::normalize_url;

/// FIFO backlog of URLs awaiting a probe attempt.
///
/// The queue itself is not synchronized; the dispatcher owns a locked
/// instance and keeps the critical sections to single enqueue/drain calls.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<String>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one URL after normalization.
    ///
    /// Returns the normalized URL, or `None` if the input was empty after
    /// trimming. Duplicates of URLs already queued are accepted; a caller
    /// re-enqueueing the same URL twice before a drain gets two probes.
    pub fn enqueue(&mut self, raw: &str) -> Option<String> {
        let url = normalize_url(raw);
        if url.is_empty() {
            return None;
        }
        self.entries.push_back(url.to_string());
        Some(url.to_string())
    }

    /// Atomically remove and return the entire current backlog, FIFO order.
    ///
    /// Enqueues that arrive after this call start a fresh backlog for the
    /// next drain cycle.
    pub fn drain_all(&mut self) -> Vec<String> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
