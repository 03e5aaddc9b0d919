//! Probe core: pure data model for the URL probe dispatcher.
//!
//! No I/O and no async machinery lives here; the engine crate wraps these
//! types in whatever synchronization it needs.
mod queue;
mod request;
mod status;
mod table;

pub use queue::PendingQueue;
pub use request::{dedupe_batch, normalize_url, url_key};
pub use status::ProbeStatus;
pub use table::{StatusRow, StatusTable};
