//! Post-switch verification.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Why a verification request did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Reachability check run against a server after it acquires the failover IP.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Succeeds on any 2xx response received within `timeout`.
    async fn verify(&self, url: &Url, timeout: Duration) -> Result<(), VerifyError>;
}

/// HTTP GET verifier.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
}

impl HttpVerifier {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ip-failover-watch/", env!("CARGO_PKG_VERSION")))
            // A pooled connection could reach the previous holder.
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, url: &Url, timeout: Duration) -> Result<(), VerifyError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifyError::Timeout {
                        url: url.to_string(),
                        timeout,
                    }
                } else {
                    VerifyError::Request {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(VerifyError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
