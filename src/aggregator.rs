use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::config::AggregationConfig;
use crate::models::perk::TokenCount;
use crate::upstream::{OwnershipIndex, UpstreamError};

#[derive(Debug, Clone, Copy)]
pub struct AggregationSettings {
    pub concurrency: usize,
    pub total_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl From<&AggregationConfig> for AggregationSettings {
    fn from(config: &AggregationConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            total_timeout: config.total_timeout(),
            retry_attempts: config.retry_attempts,
            retry_backoff: config.retry_backoff(),
        }
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self::from(&AggregationConfig::default())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    /// One entry per input address, in input order.
    pub counts: Vec<TokenCount>,
    pub total_count: u64,
    pub failed_lookups: usize,
}

#[derive(Clone)]
pub struct TokenAggregator {
    ownership: Arc<dyn OwnershipIndex>,
    settings: AggregationSettings,
}

impl TokenAggregator {
    pub fn new(ownership: Arc<dyn OwnershipIndex>, settings: AggregationSettings) -> Self {
        assert!(
            settings.concurrency > 0,
            "Aggregation concurrency must be positive"
        );
        assert!(
            settings.concurrency <= 16,
            "Aggregation concurrency exceeds defensive bound"
        );
        Self {
            ownership,
            settings,
        }
    }

    /// Sums `token` holdings across `addresses`.
    ///
    /// Every address is queried, duplicates included. A lookup that fails or
    /// misses the overall deadline contributes `0` and never fails the batch.
    pub async fn aggregate(&self, addresses: &[String], token: &str) -> AggregateOutcome {
        if addresses.is_empty() {
            return AggregateOutcome::default();
        }
        let deadline = Instant::now() + self.settings.total_timeout;

        // Built eagerly: a lazy borrowing `map` keeps the future from being `Send`.
        let lookups: Vec<_> = addresses
            .iter()
            .map(|address| self.lookup(address, token, deadline))
            .collect();
        let results: Vec<(TokenCount, bool)> = stream::iter(lookups)
            .buffered(self.settings.concurrency)
            .collect()
            .await;

        let mut outcome = AggregateOutcome {
            counts: Vec::with_capacity(results.len()),
            total_count: 0,
            failed_lookups: 0,
        };
        for (count, succeeded) in results {
            if !succeeded {
                outcome.failed_lookups += 1;
            }
            outcome.total_count = outcome.total_count.saturating_add(count.count);
            outcome.counts.push(count);
        }
        debug!(
            addresses = addresses.len(),
            total = outcome.total_count,
            failed = outcome.failed_lookups,
            "Token aggregation finished"
        );
        outcome
    }

    async fn lookup(&self, address: &str, token: &str, deadline: Instant) -> (TokenCount, bool) {
        let result = timeout_at(deadline, self.fetch_with_retry(address, token)).await;
        let (count, succeeded) = match result {
            Ok(Ok(count)) => {
                debug!(address, count, "Token count fetched");
                (count, true)
            }
            Ok(Err(err)) => {
                warn!(address, stage = "ownership", "Error fetching tokens: {err}");
                (0, false)
            }
            Err(_) => {
                warn!(
                    address,
                    stage = "ownership",
                    "Aggregation deadline reached before tokens were fetched"
                );
                (0, false)
            }
        };
        let entry = TokenCount {
            address: address.to_string(),
            count,
        };
        (entry, succeeded)
    }

    async fn fetch_with_retry(&self, address: &str, token: &str) -> Result<u64, UpstreamError> {
        let mut attempt = 0u32;
        loop {
            match self.ownership.token_count(address, token).await {
                Ok(count) => return Ok(count),
                Err(err) if attempt < self.settings.retry_attempts && is_retryable(&err) => {
                    let backoff = self.settings.retry_backoff.saturating_mul(1 << attempt);
                    debug!(address, attempt, ?backoff, "Retrying ownership lookup: {err}");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_retryable(err: &UpstreamError) -> bool {
    match err {
        UpstreamError::Request { .. } | UpstreamError::Timeout { .. } => true,
        UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
        UpstreamError::Malformed { .. } => false,
    }
}
