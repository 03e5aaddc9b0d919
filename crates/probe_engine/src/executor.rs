use probe_core::ProbeStatus;

use crate::config::DispatcherConfig;
use crate::dispatcher::DispatcherError;

/// Classified result of one probe attempt.
///
/// The executor-side half of [`ProbeStatus`]: a probe either succeeds or
/// fails with a human-readable reason. No fault escapes the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Succeeded,
    Failed { reason: String },
}

impl ProbeOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        ProbeOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn into_status(self) -> ProbeStatus {
        match self {
            ProbeOutcome::Succeeded => ProbeStatus::Succeeded,
            ProbeOutcome::Failed { reason } => ProbeStatus::Failed(reason),
        }
    }
}

/// One HTTP(S) GET-style attempt against a single URL.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Production prober backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProber {
    client: reqwest::Client,
}

impl ReqwestProber {
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, DispatcherError> {
        let mut builder =
            reqwest::Client::builder().min_tls_version(config.min_tls_version.to_reqwest());
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| DispatcherError::ClientBuild(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for ReqwestProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let parsed = match url::Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => return ProbeOutcome::failed(format!("invalid url: {err}")),
        };

        let response = match self.client.get(parsed).send().await {
            Ok(response) => response,
            Err(err) => return ProbeOutcome::failed(describe_transport_error(&err)),
        };

        let status = response.status();
        if !status.is_success() {
            // The reference transport raised protocol errors for non-2xx.
            return ProbeOutcome::failed(format!("http status {}", status.as_u16()));
        }

        // Drain the body so a mid-transfer fault still counts as a failure;
        // the content itself is not inspected.
        match response.bytes().await {
            Ok(_) => ProbeOutcome::Succeeded,
            Err(err) => ProbeOutcome::failed(describe_transport_error(&err)),
        }
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "timeout".to_string();
    }
    if err.is_redirect() {
        return "redirect limit exceeded".to_string();
    }
    if err.is_connect() {
        // Surface the connection-level cause (refused, DNS, TLS handshake).
        if let Some(source) = std::error::Error::source(err) {
            return format!("connect error: {source}");
        }
        return "connect error".to_string();
    }
    err.to_string()
}
