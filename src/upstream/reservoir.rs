use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{OwnershipIndex, UpstreamError, decode_json, request_error};

const SERVICE: &str = "reservoir";
const WALLET_ADDRESS_BYTES: usize = 20;

#[derive(Clone)]
pub struct ReservoirClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReservoirClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        assert!(!base_url.is_empty(), "Reservoir base URL must be provided");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl OwnershipIndex for ReservoirClient {
    async fn token_count(&self, address: &str, token: &str) -> Result<u64, UpstreamError> {
        ensure_wallet_address(address)?;
        let response = self
            .http
            .get(format!("{}/users/{address}/tokens/v10", self.base_url))
            .query(&[("tokens", token)])
            .header(reqwest::header::ACCEPT, "application/json")
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|source| request_error(SERVICE, source))?;
        let body: UserTokensResponse = decode_json(SERVICE, response).await?;
        count_from_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct UserTokensResponse {
    tokens: Option<Vec<UserToken>>,
}

#[derive(Debug, Deserialize)]
struct UserToken {
    ownership: Option<Ownership>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ownership {
    token_count: Option<Value>,
}

fn count_from_response(body: UserTokensResponse) -> Result<u64, UpstreamError> {
    let tokens = body
        .tokens
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "missing `tokens` field"))?;
    let Some(first) = tokens.into_iter().next() else {
        return Ok(0);
    };
    let raw = first
        .ownership
        .and_then(|ownership| ownership.token_count)
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "missing `ownership.tokenCount`"))?;
    parse_token_count(&raw).ok_or_else(|| {
        UpstreamError::malformed(SERVICE, format!("unusable token count {raw}"))
    })
}

/// Coerces a count that may arrive as a JSON number or a numeric string.
///
/// Fractional values are truncated toward zero. Strings must be plain decimals
/// (`"12"`, `"2.9"`); signs and exponents are rejected.
pub(crate) fn parse_token_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(truncate_non_negative)),
        Value::String(text) => parse_decimal(text.trim()),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<u64> {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return None;
    }
    whole.parse().ok()
}

fn truncate_non_negative(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 {
        Some(value.trunc() as u64)
    } else {
        None
    }
}

fn ensure_wallet_address(address: &str) -> Result<(), UpstreamError> {
    let digits = address.strip_prefix("0x").ok_or_else(|| {
        UpstreamError::malformed(SERVICE, format!("address {address} lacks 0x prefix"))
    })?;
    let bytes = hex::decode(digits).map_err(|err| {
        UpstreamError::malformed(SERVICE, format!("address {address} is not hex: {err}"))
    })?;
    if bytes.len() != WALLET_ADDRESS_BYTES {
        return Err(UpstreamError::malformed(
            SERVICE,
            format!("address {address} must be {WALLET_ADDRESS_BYTES} bytes"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::StubUpstream;

    fn parse(raw: Value) -> Result<u64, UpstreamError> {
        count_from_response(serde_json::from_value(raw).expect("response shape"))
    }

    #[test]
    fn token_count_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_token_count(&json!(4)), Some(4));
        assert_eq!(parse_token_count(&json!("3")), Some(3));
        assert_eq!(parse_token_count(&json!(" 12 ")), Some(12));
        assert_eq!(parse_token_count(&json!("2.9")), Some(2));
        assert_eq!(parse_token_count(&json!(-1)), None);
        assert_eq!(parse_token_count(&json!("many")), None);
        assert_eq!(parse_token_count(&json!(2.5)), Some(2));
        assert_eq!(parse_token_count(&json!(null)), None);
    }

    #[test]
    fn string_counts_must_be_plain_decimals() {
        assert_eq!(parse_token_count(&json!("1e3")), None);
        assert_eq!(parse_token_count(&json!("-1")), None);
        assert_eq!(parse_token_count(&json!("+4")), None);
        assert_eq!(parse_token_count(&json!(".5")), None);
        assert_eq!(parse_token_count(&json!("7.")), Some(7));
    }

    #[test]
    fn first_token_ownership_is_used() {
        let count = parse(json!({
            "tokens": [
                {"ownership": {"tokenCount": "3"}},
                {"ownership": {"tokenCount": "8"}}
            ]
        }))
        .expect("count parsed");
        assert_eq!(count, 3);
    }

    #[test]
    fn empty_tokens_means_zero_and_missing_tokens_is_malformed() {
        assert_eq!(parse(json!({"tokens": []})).expect("empty list"), 0);
        assert!(matches!(
            parse(json!({"continuation": null})),
            Err(UpstreamError::Malformed { .. })
        ));
    }

    #[test]
    fn wallet_address_shape_is_checked() {
        assert!(ensure_wallet_address("0x00000000000000000000000000000000000000ab").is_ok());
        assert!(ensure_wallet_address("00000000000000000000000000000000000000ab").is_err());
        assert!(ensure_wallet_address("0xabc").is_err());
        assert!(ensure_wallet_address("0x../../admin").is_err());
    }

    #[tokio::test]
    async fn token_lookup_sends_wallet_token_and_api_key() {
        let upstream =
            StubUpstream::serve(r#"{"tokens": [{"ownership": {"tokenCount": "3"}}]}"#).await;
        let client = ReservoirClient::new(StubUpstream::client(), &upstream.base_url, "rk");
        let wallet = "0x00000000000000000000000000000000000000aa";

        let count = client.token_count(wallet, "0xabc:5").await.expect("count fetched");

        assert_eq!(count, 3);
        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(
            requests[0].path_and_query,
            format!("/users/{wallet}/tokens/v10?tokens=0xabc%3A5")
        );
        assert_eq!(requests[0].header("x-api-key"), Some("rk"));
    }

    #[tokio::test]
    async fn malformed_wallet_is_never_sent() {
        let upstream = StubUpstream::serve(r#"{"tokens": []}"#).await;
        let client = ReservoirClient::new(StubUpstream::client(), &upstream.base_url, "rk");
        let err = client.token_count("0x../../admin", "0xabc:5").await;
        assert!(matches!(err, Err(UpstreamError::Malformed { .. })));
        assert!(upstream.requests().is_empty());
    }
}
