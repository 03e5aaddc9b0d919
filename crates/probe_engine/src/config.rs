use std::time::Duration;

/// Minimum TLS protocol version the probe transport will negotiate.
///
/// The reference behavior additionally enabled SSL 3.0 by default; that was
/// a legacy accident rather than a requirement, so SSL3 is not offered here
/// and the floor defaults to TLS 1.2. Versions below the floor supported by
/// the TLS backend are honored on a best-effort basis (rustls starts at
/// TLS 1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls1_0,
    Tls1_1,
    Tls1_2,
    Tls1_3,
}

impl TlsVersion {
    pub(crate) fn to_reqwest(self) -> reqwest::tls::Version {
        match self {
            TlsVersion::Tls1_0 => reqwest::tls::Version::TLS_1_0,
            TlsVersion::Tls1_1 => reqwest::tls::Version::TLS_1_1,
            TlsVersion::Tls1_2 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::Tls1_3 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

/// Dispatcher and transport configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of probes in flight at once.
    pub concurrency_limit: usize,
    /// How often the worker polls the pending queue for new work.
    pub poll_interval: Duration,
    /// TCP connect timeout; `None` leaves the transport default in place.
    pub connect_timeout: Option<Duration>,
    /// Whole-request timeout. The dispatcher enforces no timeout of its own;
    /// `None` means a probe waits as long as the transport does.
    pub request_timeout: Option<Duration>,
    /// Floor for TLS negotiation.
    pub min_tls_version: TlsVersion,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            poll_interval: Duration::from_millis(500),
            connect_timeout: None,
            request_timeout: None,
            min_tls_version: TlsVersion::Tls1_2,
        }
    }
}
