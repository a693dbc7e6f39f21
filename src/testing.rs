//! In-memory stand-ins for the upstream services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use tokio::net::TcpListener;

use crate::upstream::{
    MessageVerifier, OwnershipIndex, SocialGraph, SocialUser, UpstreamError, Verification,
};

pub fn user(fid: u64, username: &str, addresses: &[&str]) -> SocialUser {
    SocialUser {
        fid,
        username: username.to_string(),
        verified_eth_addresses: addresses.iter().map(|a| a.to_string()).collect(),
    }
}

#[derive(Clone)]
pub struct FakeVerifier {
    verification: Verification,
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeVerifier {
    pub fn accepting(account_id: Option<u64>) -> Self {
        Self {
            verification: Verification {
                valid: true,
                account_id,
            },
            messages: Arc::default(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            verification: Verification {
                valid: false,
                account_id: None,
            },
            messages: Arc::default(),
        }
    }

    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageVerifier for FakeVerifier {
    async fn verify(&self, message_bytes: &[u8]) -> Result<Verification, UpstreamError> {
        self.messages.lock().unwrap().push(message_bytes.to_vec());
        Ok(self.verification)
    }
}

#[derive(Clone, Default)]
pub struct FakeSocialGraph {
    users: Vec<SocialUser>,
    failing: bool,
    lookups: Arc<Mutex<Vec<u64>>>,
    searches: Arc<Mutex<Vec<String>>>,
}

impl FakeSocialGraph {
    pub fn with_user(mut self, user: SocialUser) -> Self {
        self.users.push(user);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn lookups(&self) -> Vec<u64> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.lookups().len() + self.searches().len()
    }

    fn check(&self) -> Result<(), UpstreamError> {
        if self.failing {
            return Err(UpstreamError::Status {
                service: "neynar",
                status: 503,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SocialGraph for FakeSocialGraph {
    async fn user_by_id(&self, fid: u64) -> Result<Option<SocialUser>, UpstreamError> {
        self.lookups.lock().unwrap().push(fid);
        self.check()?;
        Ok(self.users.iter().find(|user| user.fid == fid).cloned())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<SocialUser>, UpstreamError> {
        self.searches.lock().unwrap().push(query.to_string());
        self.check()?;
        Ok(self
            .users
            .iter()
            .filter(|user| user.username.starts_with(query))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct FakeOwnership {
    counts: HashMap<String, u64>,
    failing: Vec<String>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeOwnership {
    pub fn with_count(mut self, address: &str, count: u64) -> Self {
        self.counts.insert(address.to_string(), count);
        self
    }

    pub fn failing_for(mut self, address: &str) -> Self {
        self.failing.push(address.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OwnershipIndex for FakeOwnership {
    async fn token_count(&self, address: &str, token: &str) -> Result<u64, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((address.to_string(), token.to_string()));
        if self.failing.iter().any(|failing| failing == address) {
            return Err(UpstreamError::malformed("reservoir", "connection reset"));
        }
        Ok(self.counts.get(address).copied().unwrap_or(0))
    }
}

/// A request received by [`StubUpstream`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Local HTTP server answering every request with one JSON body.
pub struct StubUpstream {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubUpstream {
    pub async fn serve(body: &'static str) -> Self {
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let recorder = Arc::clone(&requests);
        let app = Router::new().fallback(move |request: Request| {
            let recorder = Arc::clone(&recorder);
            async move {
                let (parts, payload) = request.into_parts();
                let payload = to_bytes(payload, usize::MAX).await.unwrap_or_default();
                recorder.lock().unwrap().push(RecordedRequest {
                    method: parts.method.to_string(),
                    path_and_query: parts
                        .uri
                        .path_and_query()
                        .map(|value| value.to_string())
                        .unwrap_or_default(),
                    headers: parts.headers,
                    body: payload.to_vec(),
                });
                ([(CONTENT_TYPE, "application/json")], body)
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub upstream");
        let addr = listener.local_addr().expect("stub upstream address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub upstream serves");
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn client() -> reqwest::Client {
        crate::upstream::build_http_client(std::time::Duration::from_secs(2))
            .expect("test http client")
    }
}
