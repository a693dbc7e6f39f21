use std::sync::Arc;

use tracing::{info, warn};

use crate::models::perk::Identity;
use crate::upstream::{MessageVerifier, SocialGraph, SocialUser, UpstreamError};

pub const MAX_MESSAGE_BYTES: usize = 4096;
pub const MAX_USERNAME_LEN: usize = 64;

/// Entry points accepted by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityQuery {
    /// Hex encoded signed message from a cast action.
    SignedAction(String),
    /// Free-text username typed into the frame.
    Username(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("message signature rejected")]
    Unauthorized,
    #[error("no account matches the query")]
    NotFound,
    #[error("verified message does not reference a cast author")]
    MissingAccount,
    #[error("malformed action payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn MessageVerifier>,
    social_graph: Arc<dyn SocialGraph>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn MessageVerifier>, social_graph: Arc<dyn SocialGraph>) -> Self {
        Self {
            verifier,
            social_graph,
        }
    }

    pub async fn resolve(&self, query: &IdentityQuery) -> Result<Identity, ResolutionError> {
        match query {
            IdentityQuery::SignedAction(message_hex) => self.resolve_signed(message_hex).await,
            IdentityQuery::Username(name) => self.resolve_username(name).await,
        }
    }

    async fn resolve_signed(&self, message_hex: &str) -> Result<Identity, ResolutionError> {
        let message = decode_message_bytes(message_hex)?;
        let verification = self.verifier.verify(&message).await.map_err(|err| {
            warn!(stage = "verify", "Message verification failed: {err}");
            err
        })?;
        if !verification.valid {
            info!("Rejected action with invalid signature");
            return Err(ResolutionError::Unauthorized);
        }
        let fid = verification
            .account_id
            .ok_or(ResolutionError::MissingAccount)?;

        let user = self
            .social_graph
            .user_by_id(fid)
            .await
            .map_err(|err| {
                warn!(stage = "identity_by_id", fid, "Identity lookup failed: {err}");
                err
            })?
            .ok_or(ResolutionError::NotFound)?;
        Ok(identity_from_user(user))
    }

    async fn resolve_username(&self, name: &str) -> Result<Identity, ResolutionError> {
        let Some(name) = canonicalize_username(name) else {
            return Err(ResolutionError::NotFound);
        };
        let users = self.social_graph.search_users(name).await.map_err(|err| {
            warn!(stage = "identity_by_name", query = name, "Identity search failed: {err}");
            err
        })?;
        let user = users
            .into_iter()
            .next()
            .ok_or(ResolutionError::NotFound)?;
        Ok(identity_from_user(user))
    }
}

fn identity_from_user(user: SocialUser) -> Identity {
    Identity {
        account_id: user.fid,
        wallet_addresses: normalize_wallet_addresses(&user.verified_eth_addresses),
        display_name: user.username,
    }
}

/// Lower-cases every address, keeping order and duplicates.
pub fn normalize_wallet_addresses(addresses: &[String]) -> Vec<String> {
    addresses
        .iter()
        .map(|address| address.trim().to_lowercase())
        .collect()
}

/// Trims the query and strips a leading `@`; `None` when nothing searchable remains.
pub fn canonicalize_username(value: &str) -> Option<&str> {
    let trimmed = value.trim().trim_start_matches('@').trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_USERNAME_LEN {
        return None;
    }
    Some(trimmed)
}

pub fn decode_message_bytes(value: &str) -> Result<Vec<u8>, ResolutionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ResolutionError::InvalidPayload(
            "messageBytes cannot be empty".to_string(),
        ));
    }
    let bytes = hex::decode(strip_hex_prefix(trimmed)).map_err(|err| {
        ResolutionError::InvalidPayload(format!("Failed to decode messageBytes as hex: {err}"))
    })?;
    if bytes.len() > MAX_MESSAGE_BYTES {
        return Err(ResolutionError::InvalidPayload(format!(
            "messageBytes exceeds {MAX_MESSAGE_BYTES} byte limit"
        )));
    }
    Ok(bytes)
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSocialGraph, FakeVerifier, user};

    fn resolver(verifier: FakeVerifier, graph: FakeSocialGraph) -> IdentityResolver {
        IdentityResolver::new(Arc::new(verifier), Arc::new(graph))
    }

    #[tokio::test]
    async fn username_resolves_first_match_with_lowercased_addresses() {
        let graph = FakeSocialGraph::default()
            .with_user(user(3, "alice", &["0xABC1", "0xdef2", "0xABC1"]))
            .with_user(user(4, "alice2", &["0x9999"]));
        let resolver = resolver(FakeVerifier::rejecting(), graph.clone());

        let identity = resolver
            .resolve(&IdentityQuery::Username(" @alice ".to_string()))
            .await
            .expect("alice resolves");

        assert_eq!(identity.account_id, 3);
        assert_eq!(identity.display_name, "alice");
        assert_eq!(identity.wallet_addresses, vec!["0xabc1", "0xdef2", "0xabc1"]);
        assert_eq!(graph.searches(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn unknown_username_is_not_found() {
        let resolver = resolver(FakeVerifier::rejecting(), FakeSocialGraph::default());
        let err = resolver
            .resolve(&IdentityQuery::Username("nobody".to_string()))
            .await
            .expect_err("no users");
        assert!(matches!(err, ResolutionError::NotFound));
    }

    #[tokio::test]
    async fn blank_username_skips_the_search() {
        let graph = FakeSocialGraph::default();
        let resolver = resolver(FakeVerifier::rejecting(), graph.clone());
        let err = resolver
            .resolve(&IdentityQuery::Username("  ".to_string()))
            .await
            .expect_err("blank query");
        assert!(matches!(err, ResolutionError::NotFound));
        assert!(graph.searches().is_empty());
    }

    #[tokio::test]
    async fn rejected_signature_never_reaches_identity_service() {
        let graph = FakeSocialGraph::default().with_user(user(7, "carol", &["0x01"]));
        let resolver = resolver(FakeVerifier::rejecting(), graph.clone());

        let err = resolver
            .resolve(&IdentityQuery::SignedAction("0a0b".to_string()))
            .await
            .expect_err("signature rejected");

        assert!(matches!(err, ResolutionError::Unauthorized));
        assert!(graph.lookups().is_empty());
    }

    #[tokio::test]
    async fn verified_action_resolves_cast_author() {
        let graph = FakeSocialGraph::default().with_user(user(7, "carol", &["0xAA"]));
        let verifier = FakeVerifier::accepting(Some(7));
        let resolver = resolver(verifier.clone(), graph.clone());

        let identity = resolver
            .resolve(&IdentityQuery::SignedAction("0x0a0b".to_string()))
            .await
            .expect("carol resolves");

        assert_eq!(identity.display_name, "carol");
        assert_eq!(identity.wallet_addresses, vec!["0xaa"]);
        assert_eq!(graph.lookups(), vec![7]);
        assert_eq!(verifier.messages(), vec![vec![0x0a, 0x0b]]);
    }

    #[tokio::test]
    async fn verified_action_without_cast_is_rejected() {
        let resolver = resolver(FakeVerifier::accepting(None), FakeSocialGraph::default());
        let err = resolver
            .resolve(&IdentityQuery::SignedAction("0a".to_string()))
            .await
            .expect_err("no cast author");
        assert!(matches!(err, ResolutionError::MissingAccount));
    }

    #[tokio::test]
    async fn identity_service_failure_is_fatal() {
        let graph = FakeSocialGraph::default().failing();
        let resolver = resolver(FakeVerifier::accepting(Some(1)), graph);
        let err = resolver
            .resolve(&IdentityQuery::SignedAction("0a".to_string()))
            .await
            .expect_err("upstream failure");
        assert!(matches!(err, ResolutionError::Upstream(_)));
    }

    #[test]
    fn message_bytes_must_be_hex() {
        assert_eq!(decode_message_bytes("0xdeadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            decode_message_bytes("zz"),
            Err(ResolutionError::InvalidPayload(_))
        ));
        assert!(decode_message_bytes("").is_err());
        let oversized = "ab".repeat(MAX_MESSAGE_BYTES + 1);
        assert!(decode_message_bytes(&oversized).is_err());
    }

    #[test]
    fn username_canonicalization() {
        assert_eq!(canonicalize_username("@boothang"), Some("boothang"));
        assert_eq!(canonicalize_username("@"), None);
        assert_eq!(canonicalize_username(&"a".repeat(MAX_USERNAME_LEN + 1)), None);
    }
}
