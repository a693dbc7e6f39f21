use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{SocialGraph, SocialUser, UpstreamError, decode_json, request_error};

const SERVICE: &str = "neynar";
const MAX_SEARCH_QUERY_LEN: usize = 64;

#[derive(Clone)]
pub struct NeynarClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NeynarClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        assert!(!base_url.is_empty(), "Neynar base URL must be provided");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header("api_key", &self.api_key)
    }
}

#[async_trait]
impl SocialGraph for NeynarClient {
    async fn user_by_id(&self, fid: u64) -> Result<Option<SocialUser>, UpstreamError> {
        let response = self
            .get("/user/bulk")
            .query(&[("fids", fid)])
            .send()
            .await
            .map_err(|source| request_error(SERVICE, source))?;
        let body: BulkUsersResponse = decode_json(SERVICE, response).await?;
        debug!(fid, users = body.users.len(), "Neynar bulk lookup completed");
        Ok(body.users.into_iter().next().map(SocialUser::from))
    }

    async fn search_users(&self, query: &str) -> Result<Vec<SocialUser>, UpstreamError> {
        let query = query.trim();
        if query.chars().count() > MAX_SEARCH_QUERY_LEN {
            return Err(UpstreamError::malformed(
                SERVICE,
                format!("search query exceeds {MAX_SEARCH_QUERY_LEN} characters"),
            ));
        }
        let response = self
            .get("/user/search")
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|source| request_error(SERVICE, source))?;
        let body: SearchUsersResponse = decode_json(SERVICE, response).await?;
        let users = body.result.map(|result| result.users).unwrap_or_default();
        debug!(query, users = users.len(), "Neynar user search completed");
        Ok(users.into_iter().map(SocialUser::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct BulkUsersResponse {
    #[serde(default)]
    users: Vec<NeynarUser>,
}

#[derive(Debug, Deserialize)]
struct SearchUsersResponse {
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    users: Vec<NeynarUser>,
}

#[derive(Debug, Deserialize)]
struct NeynarUser {
    fid: u64,
    username: String,
    #[serde(default)]
    verified_addresses: VerifiedAddresses,
}

#[derive(Debug, Default, Deserialize)]
struct VerifiedAddresses {
    #[serde(default)]
    eth_addresses: Vec<String>,
}

impl From<NeynarUser> for SocialUser {
    fn from(user: NeynarUser) -> Self {
        Self {
            fid: user.fid,
            username: user.username,
            verified_eth_addresses: user.verified_addresses.eth_addresses,
        }
    }
}
