use std::fmt;

/// Current belief about one probed URL.
///
/// `Succeeded` and `Failed` are terminal: nothing transitions out of them
/// except an explicit re-enqueue, which supersedes them with `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Enqueued, waiting for a drain cycle to pick it up.
    Pending,
    /// A probe request is in flight.
    Probing,
    /// The target responded without a transport or protocol error.
    Succeeded,
    /// The probe faulted; the string is a human-readable reason.
    Failed(String),
}

impl ProbeStatus {
    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProbeStatus::Succeeded | ProbeStatus::Failed(_))
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Matches the cell text of the reference grid.
        match self {
            ProbeStatus::Pending => write!(f, "Pending..."),
            ProbeStatus::Probing => write!(f, "Probing..."),
            ProbeStatus::Succeeded => write!(f, "OK"),
            ProbeStatus::Failed(reason) => write!(f, "{reason}"),
        }
    }
}
