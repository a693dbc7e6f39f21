use serde::{Deserialize, Serialize};

/// Body POSTed by a frame client for both cast actions and frame buttons.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameActionPayload {
    #[serde(default)]
    pub untrusted_data: UntrustedData,
    #[serde(default)]
    pub trusted_data: Option<TrustedData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UntrustedData {
    #[serde(default)]
    pub fid: Option<u64>,
    #[serde(default)]
    pub button_index: Option<u8>,
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub cast_id: Option<CastIdData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastIdData {
    pub fid: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedData {
    /// Hex encoded signed message.
    pub message_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub name: String,
    pub icon: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_url: Option<String>,
    pub action: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionKind {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub message: String,
}

impl ActionMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
