use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregator::{AggregationSettings, TokenAggregator};
use crate::config::ApiConfig;
use crate::identity::{IdentityQuery, IdentityResolver, ResolutionError};
use crate::message::format_message;
use crate::models::perk::AggregateResult;
use crate::upstream::{MessageVerifier, OwnershipIndex, SocialGraph};

/// Identity resolution, token aggregation and message formatting for the
/// configured collection. Shared by the cast action and the frame flow.
#[derive(Clone)]
pub struct PerkChecker {
    resolver: IdentityResolver,
    aggregator: TokenAggregator,
    token_address: String,
    suffix_label: String,
    message_budget: usize,
}

impl PerkChecker {
    pub fn new(
        config: &ApiConfig,
        verifier: Arc<dyn MessageVerifier>,
        social_graph: Arc<dyn SocialGraph>,
        ownership: Arc<dyn OwnershipIndex>,
    ) -> Self {
        assert!(
            !config.ownership.token_address.is_empty(),
            "Target token must be configured"
        );
        Self {
            resolver: IdentityResolver::new(verifier, social_graph),
            aggregator: TokenAggregator::new(
                ownership,
                AggregationSettings::from(&config.aggregation),
            ),
            token_address: config.ownership.token_address.clone(),
            suffix_label: config.collection.suffix_label.clone(),
            message_budget: config.collection.message_budget,
        }
    }

    pub async fn check(&self, query: &IdentityQuery) -> Result<AggregateResult, ResolutionError> {
        let identity = self.resolver.resolve(query).await?;
        let outcome = self
            .aggregator
            .aggregate(&identity.wallet_addresses, &self.token_address)
            .await;
        info!(
            fid = identity.account_id,
            wallets = identity.wallet_addresses.len(),
            total = outcome.total_count,
            failed = outcome.failed_lookups,
            "Perk check completed"
        );
        debug!(counts = ?outcome.counts, "Per-wallet token counts");

        let message = format_message(
            &identity.display_name,
            outcome.total_count,
            &self.suffix_label,
            self.message_budget,
        );
        Ok(AggregateResult {
            display_name: identity.display_name,
            total_count: outcome.total_count,
            message,
        })
    }
}
