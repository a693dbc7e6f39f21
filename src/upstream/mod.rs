//! Clients for the external services the pipeline depends on.
//!
//! Each service sits behind a trait so the resolver and aggregator can be
//! driven by in-memory fakes in tests:
//! - [`MessageVerifier`]: hub that validates signed frame/action messages
//! - [`SocialGraph`]: account lookup by id or username (Neynar)
//! - [`OwnershipIndex`]: per-wallet token balances (Reservoir)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

mod hub;
mod neynar;
mod reservoir;

pub use hub::HubVerifier;
pub use neynar::NeynarClient;
pub use reservoir::ReservoirClient;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} returned a malformed response: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },
    #[error("{service} did not answer before the deadline")]
    Timeout { service: &'static str },
}

impl UpstreamError {
    pub fn malformed(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            reason: reason.into(),
        }
    }
}

/// Outcome of validating a signed message with the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    /// Author of the cast the action was invoked on.
    pub account_id: Option<u64>,
}

/// A social account as returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialUser {
    pub fid: u64,
    pub username: String,
    pub verified_eth_addresses: Vec<String>,
}

#[async_trait]
pub trait MessageVerifier: Send + Sync {
    async fn verify(&self, message_bytes: &[u8]) -> Result<Verification, UpstreamError>;
}

#[async_trait]
pub trait SocialGraph: Send + Sync {
    async fn user_by_id(&self, fid: u64) -> Result<Option<SocialUser>, UpstreamError>;

    async fn search_users(&self, query: &str) -> Result<Vec<SocialUser>, UpstreamError>;
}

#[async_trait]
pub trait OwnershipIndex: Send + Sync {
    /// Units of `token` held by `address`; `0` when the wallet holds none.
    async fn token_count(&self, address: &str, token: &str) -> Result<u64, UpstreamError>;
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    assert!(
        timeout >= Duration::from_millis(100),
        "Timeout below 100ms is unsafe"
    );
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("perk-frame/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build upstream HTTP client")
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|source| request_error(service, source))?;
    serde_json::from_slice(&body).map_err(|err| UpstreamError::malformed(service, err.to_string()))
}

pub(crate) fn request_error(service: &'static str, source: reqwest::Error) -> UpstreamError {
    if source.is_timeout() {
        UpstreamError::Timeout { service }
    } else {
        UpstreamError::Request { service, source }
    }
}
