use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::types::Target;
use reqwest::{redirect, Client};
use std::time::Duration;
use thiserror::Error;
use tokio::time;

/// Why a single probe produced no status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("timed out")]
    Timeout,
    #[error("connection failed")]
    Connect,
    #[error("request failed")]
    Request,
    #[error("redirect failed")]
    Redirect,
    #[error("transport error")]
    Other,
}

impl ProbeFailure {
    fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeFailure::Timeout
        } else if err.is_connect() {
            ProbeFailure::Connect
        } else if err.is_redirect() {
            ProbeFailure::Redirect
        } else if err.is_request() {
            ProbeFailure::Request
        } else {
            ProbeFailure::Other
        }
    }
}

/// Outcome of one GET: either a status code or a failure kind the worker drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Status(u16),
    Failed(ProbeFailure),
}

/// Issues single bounded-timeout GET requests over one shared connection pool.
#[derive(Clone, Debug)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Build the shared transport. A malformed proxy URL is a configuration error.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let redirect_policy = if config.follow_redirects {
            redirect::Policy::limited(10)
        } else {
            redirect::Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy)
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(config.threads);

        if let Some(proxy) = config.proxy.as_deref() {
            let p = reqwest::Proxy::all(proxy).map_err(|source| ScanError::Proxy {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(p);
        }

        let client = builder.build().map_err(ScanError::HttpClient)?;
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Perform one GET against `target`. Never retries.
    pub async fn probe(&self, target: &Target) -> ProbeOutcome {
        match time::timeout(self.timeout, self.client.get(target.as_str()).send()).await {
            Ok(Ok(resp)) => ProbeOutcome::Status(resp.status().as_u16()),
            Ok(Err(e)) => ProbeOutcome::Failed(ProbeFailure::classify(&e)),
            Err(_) => ProbeOutcome::Failed(ProbeFailure::Timeout),
        }
    }
}
