//! Probe engine: concurrency-limited URL probe dispatcher.
mod config;
mod dispatcher;
mod executor;
mod sink;

pub use config::{DispatcherConfig, TlsVersion};
pub use dispatcher::{DispatcherError, DispatcherHandle};
pub use executor::{ProbeOutcome, Prober, ReqwestProber};
pub use sink::{ChannelStatusSink, StatusChange, StatusSink};

// Status vocabulary shared with the pure core.
pub use probe_core::{ProbeStatus, StatusRow};
