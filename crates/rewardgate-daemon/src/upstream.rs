//! Shared plumbing for the read-only HTTP collaborators (directory,
//! reputation service, chain RPC).

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned malformed data: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },

    #[error("{service} rejected the request: {detail}")]
    Rejected {
        service: &'static str,
        detail: String,
    },
}

impl UpstreamError {
    pub fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { service, source }
    }

    pub fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            detail: detail.into(),
        }
    }
}

pub fn http_client(timeout_ms: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(concat!("rewardgate/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub(crate) fn trim_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}
