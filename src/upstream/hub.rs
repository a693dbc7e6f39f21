use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{MessageVerifier, UpstreamError, Verification, decode_json, request_error};

const SERVICE: &str = "hub";

/// Delegates signature checks to a hub's `validateMessage` endpoint.
#[derive(Clone)]
pub struct HubVerifier {
    http: reqwest::Client,
    hub_url: String,
    api_key: String,
    api_key_header: String,
}

impl HubVerifier {
    pub fn new(http: reqwest::Client, hub_url: &str, api_key: &str, api_key_header: &str) -> Self {
        assert!(!hub_url.is_empty(), "Hub URL must be provided");
        assert!(!api_key_header.is_empty(), "Hub API key header must be named");
        Self {
            http,
            hub_url: hub_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_key_header: api_key_header.to_string(),
        }
    }
}

#[async_trait]
impl MessageVerifier for HubVerifier {
    async fn verify(&self, message_bytes: &[u8]) -> Result<Verification, UpstreamError> {
        let response = self
            .http
            .post(format!("{}/v1/validateMessage", self.hub_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(self.api_key_header.as_str(), &self.api_key)
            .body(message_bytes.to_vec())
            .send()
            .await
            .map_err(|source| request_error(SERVICE, source))?;
        let body: ValidateMessageResponse = decode_json(SERVICE, response).await?;
        let verification = body.into_verification();
        debug!(
            valid = verification.valid,
            account_id = ?verification.account_id,
            "Hub message validation completed"
        );
        Ok(verification)
    }
}

#[derive(Debug, Deserialize)]
struct ValidateMessageResponse {
    #[serde(default)]
    valid: bool,
    message: Option<HubMessage>,
}

#[derive(Debug, Deserialize)]
struct HubMessage {
    data: Option<HubMessageData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubMessageData {
    frame_action_body: Option<FrameActionBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameActionBody {
    cast_id: Option<CastId>,
}

#[derive(Debug, Deserialize)]
struct CastId {
    fid: u64,
}

impl ValidateMessageResponse {
    fn into_verification(self) -> Verification {
        let account_id = self
            .message
            .and_then(|message| message.data)
            .and_then(|data| data.frame_action_body)
            .and_then(|body| body.cast_id)
            .map(|cast| cast.fid);
        Verification {
            valid: self.valid,
            account_id,
        }
    }
}
